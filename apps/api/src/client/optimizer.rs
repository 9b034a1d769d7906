use std::sync::Arc;

use tracing::warn;

use super::{BusyState, InterviewBackend, Notification};
use crate::flows::optimizer::ResumeOptimizationRequest;
use crate::resumes::ResumeLibrary;
use crate::validation::{Limits, Validate};

/// Resume optimizer view. The resume text always comes from the library selection.
pub struct ResumeOptimizerView {
    backend: Arc<dyn InterviewBackend>,
    limits: Limits,
    pending: BusyState<bool>,
    optimized: Option<String>,
    notifications: Vec<Notification>,
}

impl ResumeOptimizerView {
    pub fn new(backend: Arc<dyn InterviewBackend>, limits: Limits) -> Self {
        Self {
            backend,
            limits,
            pending: BusyState::new(false),
            optimized: None,
            notifications: Vec::new(),
        }
    }

    pub fn optimized(&self) -> Option<&str> {
        self.optimized.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_idle()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub async fn optimize(&mut self, library: &ResumeLibrary, job_description: &str) -> bool {
        let request = ResumeOptimizationRequest {
            resume_content: library.selected_content(),
            job_description: job_description.to_string(),
        };
        if let Err(e) = request.validate(&self.limits) {
            self.notifications
                .push(Notification::error("Invalid Input", e.user_message()));
            return false;
        }

        let busy = self.pending.enter(true);
        let result = self.backend.optimize_resume(request).await;
        drop(busy);

        match result {
            Ok(result) => {
                self.optimized = Some(result.optimized_resume);
                self.notifications.push(Notification::info(
                    "Success!",
                    "Your resume has been optimized.",
                ));
                true
            }
            Err(e) => {
                warn!("Resume optimization failed: {e}");
                self.notifications.push(Notification::error(
                    "Error",
                    "Failed to optimize resume. Please try again.",
                ));
                false
            }
        }
    }
}
