// Flow Dispatchers: one per feature.
// Each validates its request, builds a prompt, calls the model through
// llm_client and returns a typed result. No flow talks to Gemini directly.

pub mod copilot;
pub mod handlers;
pub mod optimizer;
pub mod prompts;
pub mod questions;
pub mod screen;
pub mod speech;

use crate::errors::AppError;
use crate::llm_client::LlmError;

/// Maps a model-call failure onto the error taxonomy.
/// Shape problems in the model's answer are `ModelOutput`; transport and API
/// failures are `Llm`.
pub(crate) fn model_error(flow: &str, err: LlmError) -> AppError {
    match err {
        LlmError::Parse(e) => {
            AppError::ModelOutput(format!("{flow}: model output did not match schema: {e}"))
        }
        LlmError::EmptyContent => AppError::ModelOutput(format!("{flow}: model returned no content")),
        other => AppError::Llm(format!("{flow} failed: {other}")),
    }
}
