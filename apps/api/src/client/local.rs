use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::InterviewBackend;
use crate::errors::AppError;
use crate::flows::copilot::{self, CopilotRequest};
use crate::flows::optimizer::{self, OptimizedResume, ResumeOptimizationRequest};
use crate::flows::questions::{self, PracticeQuestionRequest, PracticeQuestions};
use crate::flows::screen::{self, ExtractedQuestion, ScreenshotRequest};
use crate::flows::speech::{self, SpeechAudio};
use crate::llm_client::GenerativeModel;
use crate::relay::RelayEvent;
use crate::validation::Limits;

/// Runs the flow dispatchers in-process against a model.
#[derive(Clone)]
pub struct LocalBackend {
    model: Arc<dyn GenerativeModel>,
    limits: Limits,
}

impl LocalBackend {
    pub fn new(model: Arc<dyn GenerativeModel>, limits: Limits) -> Self {
        Self { model, limits }
    }
}

#[async_trait]
impl InterviewBackend for LocalBackend {
    async fn stream_answer(
        &self,
        request: CopilotRequest,
    ) -> Result<mpsc::Receiver<RelayEvent>, AppError> {
        copilot::stream_answer(self.model.clone(), request, &self.limits)
    }

    async fn practice_questions(
        &self,
        request: PracticeQuestionRequest,
    ) -> Result<PracticeQuestions, AppError> {
        questions::generate_practice_questions(self.model.as_ref(), request, &self.limits).await
    }

    async fn extract_question(
        &self,
        request: ScreenshotRequest,
    ) -> Result<ExtractedQuestion, AppError> {
        screen::extract_question(self.model.as_ref(), request, &self.limits).await
    }

    async fn optimize_resume(
        &self,
        request: ResumeOptimizationRequest,
    ) -> Result<OptimizedResume, AppError> {
        optimizer::optimize_resume(self.model.as_ref(), request, &self.limits).await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AppError> {
        speech::synthesize_speech(self.model.as_ref(), text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::MockModel;
    use crate::relay::collect_answer;

    #[tokio::test]
    async fn test_local_backend_streams_through_relay() {
        let model = Arc::new(MockModel::fragments(&["one ", "two"]));
        let backend = LocalBackend::new(model.clone(), Limits::default());
        let rx = backend
            .stream_answer(CopilotRequest {
                question: "Count".to_string(),
                resume: None,
                history: None,
            })
            .await
            .unwrap();
        assert_eq!(collect_answer(rx).await.text, "one two");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_local_backend_applies_configured_limits() {
        let model = Arc::new(MockModel::text(r#"{"optimizedResume": "new"}"#));
        let backend = LocalBackend::new(model.clone(), Limits { jd_min_chars: 5 });
        let result = backend
            .optimize_resume(ResumeOptimizationRequest {
                resume_content: "old".to_string(),
                job_description: "Rust dev".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result.optimized_resume, "new");
    }
}
