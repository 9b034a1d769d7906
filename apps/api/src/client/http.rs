//! `InterviewBackend` over the InterviewAce HTTP API.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::InterviewBackend;
use crate::errors::AppError;
use crate::flows::copilot::CopilotRequest;
use crate::flows::handlers::{CHUNK_EVENT, DONE_EVENT, ERROR_EVENT};
use crate::flows::optimizer::{OptimizedResume, ResumeOptimizationRequest};
use crate::flows::questions::{PracticeQuestionRequest, PracticeQuestions};
use crate::flows::screen::{ExtractedQuestion, ScreenshotRequest};
use crate::flows::speech::{SpeechAudio, SpeechRequest};
use crate::llm_client::sse::{SseDecoder, SseEvent};
use crate::relay::{RelayEvent, RELAY_CAPACITY, STREAM_FAILURE_MESSAGE};

/// Sent when the answer stream closes without `done` or `error`.
pub const TRUNCATED_STREAM_MESSAGE: &str = "The answer stream ended unexpectedly.";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, AppError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(path, body)
            .await?
            .json::<T>()
            .await
            .map_err(transport_error)
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(e).context("InterviewAce API request failed"))
}

/// Rebuilds the server's `AppError` from its `{"error": {code, message}}` body.
async fn error_from_response(response: Response) -> AppError {
    let status = response.status();
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => AppError::from_code(&envelope.error.code, envelope.error.message),
        Err(_) => AppError::Internal(anyhow::anyhow!("API responded with status {status}")),
    }
}

enum Forward {
    Continue,
    Stop,
}

/// Translates one server-sent event into relay events.
async fn forward(tx: &mpsc::Sender<RelayEvent>, event: SseEvent) -> Forward {
    match event.event.as_deref() {
        Some(CHUNK_EVENT) => {
            let text = match serde_json::from_str::<ChunkPayload>(&event.data) {
                Ok(chunk) => chunk.text,
                Err(e) => {
                    warn!("Malformed chunk event: {e}");
                    let _ = tx
                        .send(RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string()))
                        .await;
                    return Forward::Stop;
                }
            };
            if tx.send(RelayEvent::Fragment(text)).await.is_err() {
                return Forward::Stop;
            }
            Forward::Continue
        }
        Some(ERROR_EVENT) => {
            let message = serde_json::from_str::<ErrorPayload>(&event.data)
                .map(|p| p.message)
                .unwrap_or_else(|_| STREAM_FAILURE_MESSAGE.to_string());
            let _ = tx.send(RelayEvent::Failed(message)).await;
            Forward::Stop
        }
        Some(DONE_EVENT) => Forward::Stop,
        _ => Forward::Continue,
    }
}

#[async_trait]
impl InterviewBackend for HttpBackend {
    async fn stream_answer(
        &self,
        request: CopilotRequest,
    ) -> Result<mpsc::Receiver<RelayEvent>, AppError> {
        let response = self.send("/api/v1/copilot/answer", &request).await?;
        let (tx, rx) = mpsc::channel(RELAY_CAPACITY);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("Answer stream interrupted: {e}");
                        let _ = tx
                            .send(RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string()))
                            .await;
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    if let Forward::Stop = forward(&tx, event).await {
                        return;
                    }
                }
            }

            if let Some(event) = decoder.finish() {
                if let Forward::Stop = forward(&tx, event).await {
                    return;
                }
            }

            debug!("Answer stream closed without a terminal event");
            let _ = tx
                .send(RelayEvent::Failed(TRUNCATED_STREAM_MESSAGE.to_string()))
                .await;
        });

        Ok(rx)
    }

    async fn practice_questions(
        &self,
        request: PracticeQuestionRequest,
    ) -> Result<PracticeQuestions, AppError> {
        self.post_json("/api/v1/questions/practice", &request).await
    }

    async fn extract_question(
        &self,
        request: ScreenshotRequest,
    ) -> Result<ExtractedQuestion, AppError> {
        self.post_json("/api/v1/questions/extract", &request).await
    }

    async fn optimize_resume(
        &self,
        request: ResumeOptimizationRequest,
    ) -> Result<OptimizedResume, AppError> {
        self.post_json("/api/v1/resumes/optimize", &request).await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AppError> {
        let request = SpeechRequest {
            text: text.to_string(),
        };
        self.post_json("/api/v1/speech", &request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::mock::{MockModel, MockReply};
    use crate::relay::collect_answer;
    use crate::resumes::{MemoryRepository, ResumeLibrary};
    use crate::routes::build_router;
    use crate::state::AppState;
    use crate::validation::Limits;

    /// Serves the real router on an ephemeral port.
    async fn serve(model: MockModel) -> HttpBackend {
        let library = ResumeLibrary::load(Box::new(MemoryRepository::default())).unwrap();
        let state = AppState::new(Arc::new(model), Limits::default(), library);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        HttpBackend::new(format!("http://{addr}/"))
    }

    fn question(q: &str) -> CopilotRequest {
        CopilotRequest {
            question: q.to_string(),
            resume: None,
            history: None,
        }
    }

    #[tokio::test]
    async fn test_streamed_answer_round_trips_over_http() {
        let backend = serve(MockModel::fragments(&["Use ", "a ", "hash map."])).await;
        let rx = backend.stream_answer(question("Two sum?")).await.unwrap();
        let outcome = collect_answer(rx).await;
        assert_eq!(outcome.text, "Use a hash map.");
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn test_stream_failure_arrives_as_failed_event() {
        let backend = serve(MockModel::new(MockReply::Fragments(vec![
            Ok("Use ".to_string()),
            Err("quota".to_string()),
        ])))
        .await;
        let rx = backend.stream_answer(question("Two sum?")).await.unwrap();
        let outcome = collect_answer(rx).await;
        assert_eq!(outcome.text, "Use ");
        assert_eq!(outcome.error.as_deref(), Some(STREAM_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_validation_error_is_rebuilt_from_body() {
        let backend = serve(MockModel::text("unused")).await;
        let err = backend
            .practice_questions(PracticeQuestionRequest {
                role: "x".to_string(),
                company: None,
            })
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert_eq!(msg, "Role is required and must be at least 2 characters.")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_question_rejected_before_stream() {
        let backend = serve(MockModel::fragments(&["unused"])).await;
        let err = backend.stream_answer(question("")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_internal_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        let err = backend.synthesize_speech("Hello").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_forward_ignores_unknown_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let event = SseEvent {
            event: None,
            data: "ping".to_string(),
        };
        assert!(matches!(forward(&tx, event).await, Forward::Continue));
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
