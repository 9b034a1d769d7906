use std::sync::Arc;

use tracing::warn;

use super::{BusyState, InterviewBackend, Notification};
use crate::flows::questions::PracticeQuestionRequest;
use crate::validation::{Limits, Validate};

/// Practice-question generator view.
pub struct PracticeQuestionsView {
    backend: Arc<dyn InterviewBackend>,
    pending: BusyState<bool>,
    questions: Vec<String>,
    notifications: Vec<Notification>,
}

impl PracticeQuestionsView {
    pub fn new(backend: Arc<dyn InterviewBackend>) -> Self {
        Self {
            backend,
            pending: BusyState::new(false),
            questions: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_idle()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Returns whether a new list was stored. A failed request keeps the old list.
    pub async fn generate(&mut self, role: &str, company: &str) -> bool {
        let request = PracticeQuestionRequest {
            role: role.to_string(),
            company: Some(company.to_string()),
        };
        if let Err(e) = request.validate(&Limits::default()) {
            self.notifications
                .push(Notification::error("Invalid Input", e.user_message()));
            return false;
        }

        let busy = self.pending.enter(true);
        let result = self.backend.practice_questions(request).await;
        drop(busy);

        match result {
            Ok(result) => {
                self.questions = result.questions;
                true
            }
            Err(e) => {
                warn!("Practice question generation failed: {e}");
                self.notifications.push(Notification::error(
                    "Error",
                    "Failed to generate questions. Please try again.",
                ));
                false
            }
        }
    }
}
