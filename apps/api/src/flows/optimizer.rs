//! Resume Optimization: rewrites a resume for a job description.
//! The result is a complete replacement document, not a diff.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::flows::model_error;
use crate::flows::prompts::RESUME_OPTIMIZE_TEMPLATE;
use crate::llm_client::prompts::{render, JSON_ONLY_SYSTEM};
use crate::llm_client::{generate_json, GenerativeModel, ModelRequest, OutputMode, PromptPart};
use crate::validation::{Limits, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeOptimizationRequest {
    #[serde(default)]
    pub resume_content: String,
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedResume {
    pub optimized_resume: String,
}

pub fn build_optimizer_prompt(request: &ResumeOptimizationRequest) -> String {
    render(
        RESUME_OPTIMIZE_TEMPLATE,
        &[
            ("job_description", request.job_description.as_str()),
            ("resume_content", request.resume_content.as_str()),
        ],
    )
}

pub async fn optimize_resume(
    model: &dyn GenerativeModel,
    request: ResumeOptimizationRequest,
    limits: &Limits,
) -> Result<OptimizedResume, AppError> {
    request.validate(limits)?;
    info!(
        resume_chars = request.resume_content.len(),
        jd_chars = request.job_description.len(),
        "Optimizing resume"
    );

    let model_request = ModelRequest::new(
        vec![PromptPart::Text(build_optimizer_prompt(&request))],
        OutputMode::Json,
    )
    .with_system(JSON_ONLY_SYSTEM);

    let result: OptimizedResume = generate_json(model, model_request)
        .await
        .map_err(|e| model_error("Resume optimization", e))?;

    if result.optimized_resume.trim().is_empty() {
        return Err(AppError::ModelOutput(
            "The model returned an empty resume.".to_string(),
        ));
    }

    Ok(result)
}
