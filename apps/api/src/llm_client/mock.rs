//! Scripted `GenerativeModel` for tests. Counts calls and records requests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    FragmentStream, GenerativeModel, InlineMedia, LlmError, ModelRequest, ModelResponse,
};

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Audio { mime_type: String, data: String },
    /// A response with neither text nor media.
    Empty,
    /// Streamed fragments; an `Err` ends the stream with that message.
    Fragments(Vec<Result<String, String>>),
    /// The call itself fails.
    Fail(String),
}

pub struct MockModel {
    reply: MockReply,
    calls: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModel {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(s: &str) -> Self {
        Self::new(MockReply::Text(s.to_string()))
    }

    pub fn fragments(parts: &[&str]) -> Self {
        Self::new(MockReply::Fragments(
            parts.iter().map(|p| Ok(p.to_string())).collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests.lock().last().cloned()
    }

    fn record(&self, request: ModelRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
    }
}

fn api_failure(message: &str) -> LlmError {
    LlmError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        self.record(request);
        match &self.reply {
            MockReply::Text(text) => Ok(ModelResponse {
                text: Some(text.clone()),
                media: None,
            }),
            MockReply::Audio { mime_type, data } => Ok(ModelResponse {
                text: None,
                media: Some(InlineMedia {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            }),
            MockReply::Empty => Ok(ModelResponse::default()),
            MockReply::Fragments(parts) => Ok(ModelResponse {
                text: Some(
                    parts
                        .iter()
                        .filter_map(|p| p.as_ref().ok())
                        .cloned()
                        .collect(),
                ),
                media: None,
            }),
            MockReply::Fail(message) => Err(api_failure(message)),
        }
    }

    async fn generate_stream(&self, request: ModelRequest) -> Result<FragmentStream, LlmError> {
        self.record(request);
        let items: Vec<Result<String, LlmError>> = match &self.reply {
            MockReply::Fragments(parts) => parts
                .iter()
                .map(|p| p.clone().map_err(|m| api_failure(&m)))
                .collect(),
            MockReply::Text(text) => vec![Ok(text.clone())],
            MockReply::Empty | MockReply::Audio { .. } => Vec::new(),
            MockReply::Fail(message) => return Err(api_failure(message)),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
