/// LLM Client: the single point of entry for all hosted-model calls in InterviewAce.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Flows depend on the `GenerativeModel` trait; `GeminiClient` is the production backend.
///
/// Models are hardcoded. Do not make configurable to prevent drift.
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod sse;

#[cfg(test)]
pub mod mock;

use sse::SseDecoder;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Model used for text, JSON and vision calls.
pub const TEXT_MODEL: &str = "gemini-2.0-flash";
/// Model used for speech synthesis.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
/// Prebuilt voice used for every spoken answer.
pub const TTS_VOICE: &str = "Algenib";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One piece of a multi-part prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    /// Inline binary content, base64-encoded.
    Media { mime_type: String, data: String },
}

impl PromptPart {
    pub fn text(s: impl Into<String>) -> Self {
        PromptPart::Text(s.into())
    }
}

/// What the caller expects back from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    Text,
    /// Ask for `application/json`; parse with `generate_json`.
    Json,
    /// Audio-only response in the given prebuilt voice.
    Speech { voice: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub parts: Vec<PromptPart>,
    pub output: OutputMode,
}

impl ModelRequest {
    pub fn new(parts: Vec<PromptPart>, output: OutputMode) -> Self {
        Self {
            system: None,
            parts,
            output,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    fn model(&self) -> &'static str {
        match self.output {
            OutputMode::Speech { .. } => TTS_MODEL,
            _ => TEXT_MODEL,
        }
    }
}

/// Inline media returned by the model (base64 payload).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub media: Option<InlineMedia>,
}

/// Lazy, finite, non-restartable sequence of answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// The hosted generative model as seen by the flows.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, LlmError>;

    async fn generate_stream(&self, request: ModelRequest) -> Result<FragmentStream, LlmError>;
}

/// Calls the model and deserializes the text response as JSON.
/// The request should use `OutputMode::Json` and describe the schema in its prompt.
pub async fn generate_json<T: DeserializeOwned>(
    model: &dyn GenerativeModel,
    request: ModelRequest,
) -> Result<T, LlmError> {
    let response = model.generate(request).await?;
    let text = response.text.ok_or(LlmError::EmptyContent)?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(text).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataRef<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    /// Concatenated text of the first candidate, if it has any text parts.
    fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    fn media(&self) -> Option<InlineMedia> {
        self.parts().find_map(|p| p.inline_data.clone())
    }
}

fn build_body(request: &ModelRequest) -> GeminiRequest<'_> {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => GeminiPart::Text { text },
            PromptPart::Media { mime_type, data } => GeminiPart::Inline {
                inline_data: InlineDataRef { mime_type, data },
            },
        })
        .collect();

    let generation_config = match &request.output {
        OutputMode::Text => None,
        OutputMode::Json => Some(GenerationConfig {
            response_mime_type: Some("application/json"),
            response_modalities: None,
            speech_config: None,
        }),
        OutputMode::Speech { voice } => Some(GenerationConfig {
            response_mime_type: None,
            response_modalities: Some(vec!["AUDIO"]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
                },
            }),
        }),
    };

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user"),
            parts,
        }],
        system_instruction: request.system.as_deref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text: system }],
        }),
        generation_config,
    }
}

fn api_error(status: u16, body: String) -> LlmError {
    // Try to parse error message
    let message = serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ────────────────────────────────────────────────────────────────────────────

/// Production `GenerativeModel` backed by the Gemini REST API.
/// Unary calls retry on 429 and 5xx; streaming calls never retry.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{GEMINI_API_BASE}/{model}:{method}")
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        let body = build_body(&request);
        let url = self.url(request.model(), "generateContent");

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(api_error(status.as_u16(), body));
            }

            let gemini: GeminiResponse = response.json().await?;

            if let Some(usage) = &gemini.usage_metadata {
                debug!(
                    "LLM call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                    request.model(),
                    usage.prompt_token_count,
                    usage.candidates_token_count
                );
            }

            return Ok(ModelResponse {
                text: gemini.text(),
                media: gemini.media(),
            });
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn generate_stream(&self, request: ModelRequest) -> Result<FragmentStream, LlmError> {
        let body = build_body(&request);
        let url = format!(
            "{}?alt=sse",
            self.url(request.model(), "streamGenerateContent")
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut events = Vec::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => events.extend(decoder.push(&chunk)),
                    Err(e) => {
                        yield Err(LlmError::Http(e));
                        return;
                    }
                }
                for event in events.drain(..) {
                    match fragment_text(&event.data) {
                        Ok(Some(text)) => yield Ok::<String, LlmError>(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                match fragment_text(&event.data) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Extracts the text delta from one streamed `GenerateContentResponse`.
fn fragment_text(data: &str) -> Result<Option<String>, LlmError> {
    if data.trim().is_empty() {
        return Ok(None);
    }
    let response: GeminiResponse = serde_json::from_str(data)?;
    Ok(response.text().filter(|t| !t.is_empty()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
