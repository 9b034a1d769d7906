//! Spoken playback of conversation messages.

use tracing::warn;

use super::{ConversationMessage, InterviewBackend, Notification};

/// Output device port.
pub trait AudioPlayer: Send {
    /// Starts playing `url` (a data URI), replacing anything already playing.
    fn play(&mut self, url: &str) -> Result<(), String>;
    fn stop(&mut self);
}

/// Tracks which message, if any, is currently being spoken.
pub struct PlaybackController {
    player: Box<dyn AudioPlayer>,
    speaking: Option<u64>,
    notifications: Vec<Notification>,
}

impl PlaybackController {
    pub fn new(player: Box<dyn AudioPlayer>) -> Self {
        Self {
            player,
            speaking: None,
            notifications: Vec::new(),
        }
    }

    pub fn speaking(&self) -> Option<u64> {
        self.speaking
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Plays `message`, or stops it if it is the one already playing.
    ///
    /// Another playing message is stopped first. Synthesized audio is cached on
    /// the message and reused on later plays.
    pub async fn toggle(
        &mut self,
        backend: &dyn InterviewBackend,
        message: &mut ConversationMessage,
    ) {
        if self.speaking == Some(message.id) {
            self.stop();
            return;
        }
        if self.speaking.is_some() {
            self.stop();
        }

        let url = match message.audio_url.clone() {
            Some(url) => url,
            None => match backend.synthesize_speech(&message.content).await {
                Ok(audio) => {
                    message.audio_url = Some(audio.media.clone());
                    audio.media
                }
                Err(e) => {
                    warn!(message_id = message.id, "Speech synthesis failed: {e}");
                    self.playback_failed();
                    return;
                }
            },
        };

        match self.player.play(&url) {
            Ok(()) => self.speaking = Some(message.id),
            Err(e) => {
                warn!(message_id = message.id, "Audio playback failed: {e}");
                self.playback_failed();
            }
        }
    }

    /// The player reached the end of the audio for `message_id`.
    pub fn finished(&mut self, message_id: u64) {
        if self.speaking == Some(message_id) {
            self.speaking = None;
        }
    }

    pub fn stop(&mut self) {
        if self.speaking.take().is_some() {
            self.player.stop();
        }
    }

    fn playback_failed(&mut self) {
        self.speaking = None;
        self.notifications.push(Notification::error(
            "Playback Error",
            "Failed to generate or play audio.",
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::client::Role;

    #[derive(Clone, Default)]
    struct RecordingPlayer {
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl AudioPlayer for RecordingPlayer {
        fn play(&mut self, url: &str) -> Result<(), String> {
            if self.fail {
                return Err("device busy".to_string());
            }
            self.log.lock().push(format!("play {url}"));
            Ok(())
        }

        fn stop(&mut self) {
            self.log.lock().push("stop".to_string());
        }
    }

    fn message(id: u64, content: &str) -> ConversationMessage {
        ConversationMessage {
            id,
            role: Role::Assistant,
            content: content.to_string(),
            audio_url: None,
        }
    }

    #[tokio::test]
    async fn test_audio_is_synthesized_once_and_cached() {
        let backend = FakeBackend::new().speech(Ok("data:audio/wav;base64,AAAA"));
        let player = RecordingPlayer::default();
        let mut playback = PlaybackController::new(Box::new(player.clone()));
        let mut msg = message(1, "Hello");

        playback.toggle(&backend, &mut msg).await;
        assert_eq!(playback.speaking(), Some(1));
        assert_eq!(msg.audio_url.as_deref(), Some("data:audio/wav;base64,AAAA"));

        playback.finished(1);
        assert_eq!(playback.speaking(), None);
        playback.toggle(&backend, &mut msg).await;

        assert_eq!(backend.speech_requests.lock().len(), 1);
        assert_eq!(player.log.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_toggling_playing_message_stops_it() {
        let backend = FakeBackend::new();
        let player = RecordingPlayer::default();
        let mut playback = PlaybackController::new(Box::new(player.clone()));
        let mut msg = message(1, "Hello");

        playback.toggle(&backend, &mut msg).await;
        playback.toggle(&backend, &mut msg).await;
        assert_eq!(playback.speaking(), None);
        assert_eq!(player.log.lock().last().map(String::as_str), Some("stop"));
    }

    #[tokio::test]
    async fn test_starting_another_message_stops_current_first() {
        let backend = FakeBackend::new();
        let player = RecordingPlayer::default();
        let mut playback = PlaybackController::new(Box::new(player.clone()));
        let mut first = message(1, "One");
        let mut second = message(2, "Two");

        playback.toggle(&backend, &mut first).await;
        playback.toggle(&backend, &mut second).await;
        assert_eq!(playback.speaking(), Some(2));

        let log = player.log.lock();
        assert!(log[0].starts_with("play"));
        assert_eq!(log[1], "stop");
        assert!(log[2].starts_with("play"));
    }

    #[tokio::test]
    async fn test_synthesis_failure_notifies_and_stays_silent() {
        let backend = FakeBackend::new().speech(Err("no media"));
        let player = RecordingPlayer::default();
        let mut playback = PlaybackController::new(Box::new(player.clone()));
        let mut msg = message(1, "Hello");

        playback.toggle(&backend, &mut msg).await;
        assert_eq!(playback.speaking(), None);
        assert_eq!(msg.audio_url, None);
        assert!(player.log.lock().is_empty());
        assert_eq!(playback.take_notifications()[0].title, "Playback Error");
    }

    #[tokio::test]
    async fn test_player_failure_notifies() {
        let backend = FakeBackend::new();
        let player = RecordingPlayer {
            fail: true,
            ..Default::default()
        };
        let mut playback = PlaybackController::new(Box::new(player));
        let mut msg = message(1, "Hello");

        playback.toggle(&backend, &mut msg).await;
        assert_eq!(playback.speaking(), None);
        assert_eq!(playback.take_notifications().len(), 1);
    }
}
