//! Hands-free voice input for the copilot.
//!
//! `ContinuousListener` buffers recognized speech and emits it as one utterance
//! once the speaker has been silent for the timeout. `VoiceCopilot` feeds those
//! utterances into a `CopilotSession`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::copilot::{CopilotSession, TurnOutcome};
use super::{CaptureError, Notification};

pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A newly recognized, final segment of speech.
    Transcript(String),
    Error(String),
    /// The recognizer stopped on its own.
    Ended,
}

/// Speech recognition port.
pub trait SpeechCapture: Send {
    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<CaptureEvent>, CaptureError>;
    fn stop(&mut self);
}

/// Cancellable delayed notification.
///
/// Each `restart` spawns a sleeping task that sends its generation number on the
/// channel returned by `new`. Restarting or cancelling aborts the previous task
/// and bumps the generation, so a stale fire is never accepted.
pub struct SilenceTimer {
    delay: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<u64>,
}

impl SilenceTimer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timer = Self {
            delay,
            generation: 0,
            handle: None,
            fired_tx,
        };
        (timer, fired_rx)
    }

    pub fn restart(&mut self) {
        self.cancel();
        let generation = self.generation;
        let delay = self.delay;
        let tx = self.fired_tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(generation);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Accepts a fire if it belongs to the armed generation, disarming the timer.
    pub fn take_fired(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

impl Drop for SilenceTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Listening,
}

enum Step {
    Capture(Option<CaptureEvent>),
    Silence(u64),
}

pub struct ContinuousListener {
    capture: Box<dyn SpeechCapture>,
    state: ListenerState,
    transcript: String,
    timer: SilenceTimer,
    fired: mpsc::UnboundedReceiver<u64>,
    events: Option<mpsc::UnboundedReceiver<CaptureEvent>>,
    notifications: Vec<Notification>,
}

impl ContinuousListener {
    pub fn new(capture: Box<dyn SpeechCapture>) -> Self {
        Self::with_timeout(capture, DEFAULT_SILENCE_TIMEOUT)
    }

    pub fn with_timeout(capture: Box<dyn SpeechCapture>, silence: Duration) -> Self {
        let (timer, fired) = SilenceTimer::new(silence);
        Self {
            capture,
            state: ListenerState::Stopped,
            transcript: String::new(),
            timer,
            fired,
            events: None,
            notifications: Vec::new(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenerState::Listening
    }

    /// Speech heard since the last emitted utterance.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn start(&mut self) -> bool {
        if self.is_listening() {
            return true;
        }
        match self.capture.start() {
            Ok(events) => {
                info!("Voice capture started");
                self.events = Some(events);
                self.state = ListenerState::Listening;
                true
            }
            Err(e) => {
                self.capture_failed(e);
                false
            }
        }
    }

    pub fn stop(&mut self) {
        if self.state == ListenerState::Stopped {
            return;
        }
        self.capture.stop();
        self.timer.cancel();
        self.events = None;
        self.transcript.clear();
        self.state = ListenerState::Stopped;
        info!("Voice capture stopped");
    }

    /// Applies one capture event. New speech restarts the silence timer unless a
    /// submission is in flight.
    pub fn on_event(&mut self, event: CaptureEvent, submitting: bool) {
        match event {
            CaptureEvent::Transcript(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                if !self.transcript.is_empty() {
                    self.transcript.push(' ');
                }
                self.transcript.push_str(text);
                if !submitting {
                    self.timer.restart();
                }
            }
            CaptureEvent::Error(e) => {
                warn!("Speech recognition error: {e}");
                self.notifications.push(Notification::error(
                    "Voice Error",
                    format!("Speech recognition error: {e}"),
                ));
                self.stop();
            }
            CaptureEvent::Ended => {
                if !self.is_listening() {
                    return;
                }
                debug!("Recognizer ended; restarting");
                match self.capture.start() {
                    Ok(events) => self.events = Some(events),
                    Err(e) => {
                        self.timer.cancel();
                        self.events = None;
                        self.state = ListenerState::Stopped;
                        self.capture_failed(e);
                    }
                }
            }
        }
    }

    /// Arms the silence timer for speech buffered while a submission was in flight.
    pub fn submission_finished(&mut self) {
        if self.is_listening() && !self.transcript.is_empty() {
            self.timer.restart();
        }
    }

    /// Handles a timer fire. Returns the buffered transcript when it should be submitted.
    pub fn on_silence(&mut self, generation: u64, submitting: bool) -> Option<String> {
        if !self.timer.take_fired(generation) || submitting || !self.is_listening() {
            return None;
        }
        let utterance = std::mem::take(&mut self.transcript);
        Some(utterance).filter(|u| !u.trim().is_empty())
    }

    /// Waits for the next utterance. Returns `None` once the listener stops.
    ///
    /// Cancel-safe: dropping the future loses no capture events.
    pub async fn next_utterance(&mut self, submitting: bool) -> Option<String> {
        loop {
            let step = {
                let events = self.events.as_mut()?;
                tokio::select! {
                    event = events.recv() => Step::Capture(event),
                    Some(generation) = self.fired.recv() => Step::Silence(generation),
                }
            };

            match step {
                Step::Capture(Some(event)) => self.on_event(event, submitting),
                Step::Capture(None) => self.on_event(CaptureEvent::Ended, submitting),
                Step::Silence(generation) => {
                    if let Some(utterance) = self.on_silence(generation, submitting) {
                        return Some(utterance);
                    }
                }
            }
            if !self.is_listening() {
                return None;
            }
        }
    }

    fn capture_failed(&mut self, error: CaptureError) {
        match error {
            CaptureError::PermissionDenied => debug!("Microphone permission denied"),
            CaptureError::NotSupported => self.notifications.push(Notification::error(
                "Voice Not Supported",
                "Your browser does not support speech recognition.",
            )),
            CaptureError::Failed(e) => self.notifications.push(Notification::error(
                "Voice Error",
                format!("Speech recognition error: {e}"),
            )),
        }
    }
}

/// A copilot session driven by the voice listener.
pub struct VoiceCopilot {
    listener: ContinuousListener,
    session: CopilotSession,
}

impl VoiceCopilot {
    pub fn new(listener: ContinuousListener, session: CopilotSession) -> Self {
        Self { listener, session }
    }

    pub fn listener_mut(&mut self) -> &mut ContinuousListener {
        &mut self.listener
    }

    pub fn session(&self) -> &CopilotSession {
        &self.session
    }

    /// Waits for an utterance and answers it. Returns `None` once the listener stops.
    ///
    /// Speech heard while the answer streams is buffered without arming the
    /// silence timer. The timer is armed for it once the turn ends.
    pub async fn run_turn(&mut self, resume: Option<&str>) -> Option<TurnOutcome> {
        let utterance = self
            .listener
            .next_utterance(self.session.is_pending())
            .await?;

        let Some(mut rx) = self.session.start(&utterance, resume).await else {
            return Some(self.end_turn());
        };

        loop {
            let listening = self.listener.is_listening();
            let event = tokio::select! {
                event = rx.recv() => Some(event),
                _ = self.listener.next_utterance(true), if listening => None,
            };
            match event {
                Some(Some(event)) => self.session.handle_event(event),
                Some(None) => break,
                None => {}
            }
        }
        Some(self.end_turn())
    }

    fn end_turn(&mut self) -> TurnOutcome {
        let outcome = self.session.finish();
        self.listener.submission_finished();
        outcome
    }
}
