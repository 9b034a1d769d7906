//! Copilot conversation session.
//!
//! Phases: `Idle → AwaitingModel → Streaming → Idle`. A turn that fails before
//! the first fragment removes its user message; a turn that fails mid-stream
//! keeps whatever text already arrived.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ConversationMessage, InterviewBackend, Notification, Role};
use crate::flows::copilot::{CopilotRequest, HistoryTurn};
use crate::relay::RelayEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopilotPhase {
    Idle,
    AwaitingModel,
    Streaming,
}

/// How a submitted turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank question or another turn in flight. Nothing changed.
    Ignored,
    /// Failed before any fragment; the user message was removed.
    Failed,
    /// Failed mid-stream; the partial answer was kept.
    Interrupted,
    Answered,
}

#[derive(Debug)]
struct Turn {
    user_id: u64,
    assistant_id: Option<u64>,
    failure: Option<TurnOutcome>,
}

pub struct CopilotSession {
    backend: Arc<dyn InterviewBackend>,
    messages: Vec<ConversationMessage>,
    phase: CopilotPhase,
    turn: Option<Turn>,
    next_id: u64,
    notifications: Vec<Notification>,
}

impl CopilotSession {
    pub fn new(backend: Arc<dyn InterviewBackend>) -> Self {
        Self {
            backend,
            messages: Vec::new(),
            phase: CopilotPhase::Idle,
            turn: None,
            next_id: 1,
            notifications: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn message_mut(&mut self, id: u64) -> Option<&mut ConversationMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn phase(&self) -> CopilotPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase != CopilotPhase::Idle
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Submits a question and drives the answer stream to completion.
    pub async fn submit(&mut self, question: &str, resume: Option<&str>) -> TurnOutcome {
        if self.is_pending() {
            return TurnOutcome::Ignored;
        }
        let Some(mut rx) = self.start(question, resume).await else {
            // No turn is recorded for a blank question, so this reports `Ignored`.
            return self.finish();
        };
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
        self.finish()
    }

    /// Appends the user message and opens the answer stream.
    ///
    /// Returns `None` when the turn was ignored or failed to open. In the
    /// failure case a turn is still recorded and `finish` reports it.
    pub async fn start(
        &mut self,
        question: &str,
        resume: Option<&str>,
    ) -> Option<mpsc::Receiver<RelayEvent>> {
        if self.is_pending() || question.trim().is_empty() {
            return None;
        }

        let user_id = self.push_message(Role::User, question.to_string());
        self.phase = CopilotPhase::AwaitingModel;
        self.turn = Some(Turn {
            user_id,
            assistant_id: None,
            failure: None,
        });

        let request = CopilotRequest {
            question: question.to_string(),
            resume: Some(resume.unwrap_or_default().to_string()),
            history: Some(
                self.messages
                    .iter()
                    .map(|m| HistoryTurn {
                        role: m.role,
                        content: m.content.clone(),
                    })
                    .collect(),
            ),
        };

        match self.backend.stream_answer(request).await {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("Copilot request failed: {e}");
                self.fail_before_stream(e.user_message());
                None
            }
        }
    }

    /// Applies one relay event to the current turn.
    pub fn handle_event(&mut self, event: RelayEvent) {
        let assistant_id = match &self.turn {
            Some(turn) if turn.failure.is_none() => turn.assistant_id,
            _ => return,
        };

        match event {
            RelayEvent::Fragment(text) => {
                let id = match assistant_id {
                    Some(id) => id,
                    None => {
                        let id = self.push_message(Role::Assistant, String::new());
                        if let Some(turn) = self.turn.as_mut() {
                            turn.assistant_id = Some(id);
                        }
                        self.phase = CopilotPhase::Streaming;
                        id
                    }
                };
                if let Some(message) = self.message_mut(id) {
                    message.content.push_str(&text);
                }
            }
            RelayEvent::Failed(message) if assistant_id.is_none() => {
                self.fail_before_stream(message);
            }
            RelayEvent::Failed(message) => {
                self.notifications
                    .push(Notification::error("Streaming Error", message));
                if let Some(turn) = self.turn.as_mut() {
                    turn.failure = Some(TurnOutcome::Interrupted);
                }
            }
        }
    }

    /// Ends the current turn and returns to `Idle`.
    pub fn finish(&mut self) -> TurnOutcome {
        self.phase = CopilotPhase::Idle;
        let Some(turn) = self.turn.take() else {
            return TurnOutcome::Ignored;
        };
        if let Some(failure) = turn.failure {
            return failure;
        }
        if turn.assistant_id.is_none() {
            // Completed without any text.
            self.push_message(Role::Assistant, String::new());
        }
        debug!(messages = self.messages.len(), "Copilot turn answered");
        TurnOutcome::Answered
    }

    fn fail_before_stream(&mut self, description: String) {
        if let Some(turn) = self.turn.as_mut() {
            let user_id = turn.user_id;
            turn.failure = Some(TurnOutcome::Failed);
            self.messages.retain(|m| m.id != user_id);
        }
        self.notifications
            .push(Notification::error("Error", description));
    }

    fn push_message(&mut self, role: Role, content: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ConversationMessage {
            id,
            role,
            content,
            audio_url: None,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::client::local::LocalBackend;
    use crate::llm_client::mock::MockModel;
    use crate::relay::STREAM_FAILURE_MESSAGE;
    use crate::validation::Limits;

    fn session(backend: FakeBackend) -> (CopilotSession, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (CopilotSession::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_answer_is_concatenation_of_fragments() {
        let (mut s, _) = session(FakeBackend::new().answer_fragments(&["Big-O ", "is ", "O(n)."]));
        assert_eq!(s.submit("Complexity?", None).await, TurnOutcome::Answered);

        let messages = s.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Big-O is O(n).");
        assert_eq!(s.phase(), CopilotPhase::Idle);
    }

    #[tokio::test]
    async fn test_request_carries_history_and_resume() {
        let (mut s, backend) = session(FakeBackend::new().answer_fragments(&["first"]));
        s.submit("Q1", Some("My resume")).await;
        s.submit("Q2", Some("My resume")).await;

        let requests = backend.copilot_requests.lock();
        let second = &requests[1];
        assert_eq!(second.question, "Q2");
        assert_eq!(second.resume.as_deref(), Some("My resume"));
        let history = second.history.as_ref().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "Q1");
        assert_eq!(history[1].content, "first");
        assert_eq!(history[2].content, "Q2");
    }

    #[tokio::test]
    async fn test_missing_resume_is_sent_as_empty() {
        let (mut s, backend) = session(FakeBackend::new());
        s.submit("Q", None).await;
        assert_eq!(
            backend.copilot_requests.lock()[0].resume.as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_failure_before_stream_removes_user_message() {
        let (mut s, _) = session(FakeBackend::new().answer_error("Model unavailable"));
        assert_eq!(s.submit("Q", None).await, TurnOutcome::Failed);
        assert!(s.messages().is_empty());
        assert!(!s.is_pending());
        let notes = s.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].description, "Model unavailable");
        assert!(notes[0].destructive);
    }

    #[tokio::test]
    async fn test_failed_before_first_fragment_counts_as_failed() {
        let (mut s, _) = session(
            FakeBackend::new().answer(vec![RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string())]),
        );
        assert_eq!(s.submit("Q", None).await, TurnOutcome::Failed);
        assert!(s.messages().is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial_answer() {
        let (mut s, _) = session(FakeBackend::new().answer(vec![
            RelayEvent::Fragment("Partial".to_string()),
            RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string()),
        ]));
        assert_eq!(s.submit("Q", None).await, TurnOutcome::Interrupted);
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[1].content, "Partial");
        let notes = s.take_notifications();
        assert_eq!(notes[0].title, "Streaming Error");
        assert_eq!(s.phase(), CopilotPhase::Idle);
    }

    #[tokio::test]
    async fn test_pending_turn_blocks_resubmission() {
        let (mut s, backend) = session(FakeBackend::new().answer_fragments(&["a"]));
        let rx = s.start("Q1", None).await.unwrap();
        assert!(s.is_pending());
        assert!(s.start("Q2", None).await.is_none());
        assert_eq!(backend.copilot_requests.lock().len(), 1);

        drop(rx);
        assert_eq!(s.finish(), TurnOutcome::Answered);
        assert!(!s.is_pending());
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let (mut s, backend) = session(FakeBackend::new());
        assert_eq!(s.submit("   ", None).await, TurnOutcome::Ignored);
        assert!(s.messages().is_empty());
        assert!(backend.copilot_requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_phase_moves_to_streaming_on_first_fragment() {
        let (mut s, _) = session(FakeBackend::new());
        let _rx = s.start("Q", None).await.unwrap();
        assert_eq!(s.phase(), CopilotPhase::AwaitingModel);
        s.handle_event(RelayEvent::Fragment("x".to_string()));
        assert_eq!(s.phase(), CopilotPhase::Streaming);
        s.finish();
        assert_eq!(s.phase(), CopilotPhase::Idle);
    }

    #[tokio::test]
    async fn test_rendered_answer_matches_model_fragments_end_to_end() {
        let model = Arc::new(MockModel::fragments(&["Ownership ", "and ", "borrowing."]));
        let backend = Arc::new(LocalBackend::new(model, Limits::default()));
        let mut s = CopilotSession::new(backend);
        assert_eq!(s.submit("Why Rust?", Some("")).await, TurnOutcome::Answered);
        assert_eq!(s.messages()[1].content, "Ownership and borrowing.");
    }
}
