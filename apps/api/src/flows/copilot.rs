//! Answer Streaming: the conversational copilot flow.
//!
//! Flow: validate → build prompt (instructions, resume, history, question) →
//!       stream from the model through the relay.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::errors::AppError;
use crate::flows::prompts::{
    CANDIDATE_PREFIX, COPILOT_INSTRUCTIONS, COPILOT_QUESTION_TEMPLATE, COPILOT_RESUME_TEMPLATE,
    INTERVIEWER_PREFIX,
};
use crate::llm_client::prompts::render;
use crate::llm_client::{GenerativeModel, ModelRequest, OutputMode, PromptPart};
use crate::relay::{spawn_relay, RelayEvent};
use crate::validation::{Limits, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The interviewer's side of the conversation.
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopilotRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryTurn>>,
}

/// Builds the multi-part copilot prompt. Blank resumes are omitted.
pub fn build_copilot_prompt(request: &CopilotRequest) -> Vec<PromptPart> {
    let mut parts = vec![PromptPart::text(COPILOT_INSTRUCTIONS)];

    if let Some(resume) = request.resume.as_deref().filter(|r| !r.trim().is_empty()) {
        parts.push(PromptPart::Text(render(
            COPILOT_RESUME_TEMPLATE,
            &[("resume", resume)],
        )));
    }

    for turn in request.history.iter().flatten() {
        let prefix = match turn.role {
            Role::User => INTERVIEWER_PREFIX,
            Role::Assistant => CANDIDATE_PREFIX,
        };
        parts.push(PromptPart::Text(format!("{prefix}{}", turn.content)));
    }

    parts.push(PromptPart::Text(render(
        COPILOT_QUESTION_TEMPLATE,
        &[("question", request.question.as_str())],
    )));

    parts
}

/// Validates the request and starts streaming the answer.
///
/// Validation failures return immediately and never reach the model. Every later
/// failure arrives on the returned channel as `RelayEvent::Failed`.
pub fn stream_answer(
    model: Arc<dyn GenerativeModel>,
    request: CopilotRequest,
    limits: &Limits,
) -> Result<mpsc::Receiver<RelayEvent>, AppError> {
    request.validate(limits)?;

    let history_turns = request.history.as_ref().map_or(0, Vec::len);
    let has_resume = request
        .resume
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());
    info!(history_turns, has_resume, "Dispatching copilot answer");

    let model_request = ModelRequest::new(build_copilot_prompt(&request), OutputMode::Text);
    Ok(spawn_relay(async move {
        model.generate_stream(model_request).await
    }))
}
