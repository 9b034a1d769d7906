//! Request validators: the schema gate every flow passes through before any model call.
//!
//! Each request type implements `Validate`. Field checks are collected in order and,
//! when any fail, joined with newlines into a single `AppError::Validation`.

use crate::config::DEFAULT_JD_MIN_CHARS;
use crate::data_uri::DataUri;
use crate::errors::AppError;
use crate::flows::copilot::CopilotRequest;
use crate::flows::optimizer::ResumeOptimizationRequest;
use crate::flows::questions::PracticeQuestionRequest;
use crate::flows::screen::ScreenshotRequest;

pub const ROLE_MIN_CHARS: usize = 2;

/// Tunable limits. Only the job-description minimum varies between deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub jd_min_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            jd_min_chars: DEFAULT_JD_MIN_CHARS,
        }
    }
}

pub trait Validate {
    fn validate(&self, limits: &Limits) -> Result<(), AppError>;
}

/// Accumulates field-level messages in declaration order.
#[derive(Debug, Default)]
pub struct FieldErrors {
    messages: Vec<String>,
}

impl FieldErrors {
    pub fn require(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.messages.push(message.into());
        }
        self
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.messages.join("\n")))
        }
    }
}

/// Character length after trimming surrounding whitespace.
fn trimmed_len(s: &str) -> usize {
    s.trim().chars().count()
}

impl Validate for CopilotRequest {
    fn validate(&self, _limits: &Limits) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require(
            !self.question.trim().is_empty(),
            "Question cannot be empty.",
        );
        errors.into_result()
    }
}

impl Validate for PracticeQuestionRequest {
    fn validate(&self, _limits: &Limits) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require(
            trimmed_len(&self.role) >= ROLE_MIN_CHARS,
            format!("Role is required and must be at least {ROLE_MIN_CHARS} characters."),
        );
        errors.into_result()
    }
}

impl Validate for ScreenshotRequest {
    fn validate(&self, _limits: &Limits) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        if self.photo_data_uri.is_empty() {
            errors.require(false, "A screen capture is required.");
        } else {
            errors.require(
                DataUri::parse(&self.photo_data_uri).is_some(),
                "The screen capture must be a base64 data URI.",
            );
        }
        errors.into_result()
    }
}

impl Validate for ResumeOptimizationRequest {
    fn validate(&self, limits: &Limits) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors
            .require(
                !self.resume_content.trim().is_empty(),
                "Please select a resume.",
            )
            .require(
                trimmed_len(&self.job_description) >= limits.jd_min_chars,
                format!(
                    "Job description must be at least {} characters.",
                    limits.jd_min_chars
                ),
            );
        errors.into_result()
    }
}

/// Speech synthesis takes bare text rather than a request object.
pub fn validate_speech_text(text: &str) -> Result<(), AppError> {
    let mut errors = FieldErrors::default();
    errors.require(!text.trim().is_empty(), "Input text cannot be empty.");
    errors.into_result()
}

/// Validates the name/content pair for a new resume.
pub fn validate_new_resume(name: &str, content: &str) -> Result<(), AppError> {
    let mut errors = FieldErrors::default();
    errors.require(
        !name.trim().is_empty() && !content.trim().is_empty(),
        "Please provide a name and content for the resume.",
    );
    errors.into_result()
}
