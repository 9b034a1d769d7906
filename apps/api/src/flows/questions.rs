//! Practice-Question Generation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::flows::model_error;
use crate::flows::prompts::{PRACTICE_COMPANY_LINE, PRACTICE_QUESTIONS_TEMPLATE};
use crate::llm_client::prompts::{render, JSON_ONLY_SYSTEM};
use crate::llm_client::{generate_json, GenerativeModel, ModelRequest, OutputMode, PromptPart};
use crate::validation::{Limits, Validate};

/// The prompt asks for this many questions; the bound is not enforced.
pub const SUGGESTED_QUESTION_RANGE: std::ops::RangeInclusive<usize> = 5..=10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestionRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestions {
    pub questions: Vec<String>,
}

pub fn build_practice_prompt(request: &PracticeQuestionRequest) -> String {
    let company_line = match request.company.as_deref().map(str::trim) {
        Some(company) if !company.is_empty() => {
            render(PRACTICE_COMPANY_LINE, &[("company", company)])
        }
        _ => String::new(),
    };
    render(
        PRACTICE_QUESTIONS_TEMPLATE,
        &[
            ("role", request.role.trim()),
            ("company_line", company_line.as_str()),
        ],
    )
}

/// Generates practice questions for a role and optional company.
/// Blank entries are dropped; an answer with no usable question is an error.
pub async fn generate_practice_questions(
    model: &dyn GenerativeModel,
    request: PracticeQuestionRequest,
    limits: &Limits,
) -> Result<PracticeQuestions, AppError> {
    request.validate(limits)?;
    info!(role = %request.role.trim(), "Generating practice questions");

    let model_request = ModelRequest::new(
        vec![PromptPart::Text(build_practice_prompt(&request))],
        OutputMode::Json,
    )
    .with_system(JSON_ONLY_SYSTEM);

    let raw: PracticeQuestions = generate_json(model, model_request)
        .await
        .map_err(|e| model_error("Practice question generation", e))?;

    let questions: Vec<String> = raw
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        return Err(AppError::ModelOutput(
            "The model did not return any practice questions.".to_string(),
        ));
    }
    if !SUGGESTED_QUESTION_RANGE.contains(&questions.len()) {
        warn!(
            count = questions.len(),
            "Practice question count outside the suggested 5-10 range"
        );
    }

    Ok(PracticeQuestions { questions })
}
