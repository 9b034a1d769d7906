//! Screenshot Question Extraction.
//!
//! An empty `question` is a valid result meaning "no question visible".

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data_uri::DataUri;
use crate::errors::AppError;
use crate::flows::model_error;
use crate::flows::prompts::SCREEN_EXTRACT_PROMPT;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{generate_json, GenerativeModel, ModelRequest, OutputMode, PromptPart};
use crate::validation::{Limits, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    #[serde(default)]
    pub photo_data_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedQuestion {
    pub question: String,
}

impl ExtractedQuestion {
    pub fn is_found(&self) -> bool {
        !self.question.is_empty()
    }
}

pub async fn extract_question(
    model: &dyn GenerativeModel,
    request: ScreenshotRequest,
    limits: &Limits,
) -> Result<ExtractedQuestion, AppError> {
    request.validate(limits)?;

    let image = DataUri::parse(&request.photo_data_uri).ok_or_else(|| {
        AppError::Validation("The screen capture must be a base64 data URI.".to_string())
    })?;

    if image.is_empty() {
        debug!("Screenshot payload is empty; nothing to extract");
        return Ok(ExtractedQuestion::default());
    }

    info!(
        mime_type = %image.mime_type,
        payload_len = image.data.len(),
        "Extracting question from screenshot"
    );

    let model_request = ModelRequest::new(
        vec![
            PromptPart::text(SCREEN_EXTRACT_PROMPT),
            PromptPart::Media {
                mime_type: image.mime_type,
                data: image.data,
            },
        ],
        OutputMode::Json,
    )
    .with_system(JSON_ONLY_SYSTEM);

    let extracted: ExtractedQuestion = generate_json(model, model_request)
        .await
        .map_err(|e| model_error("Screenshot extraction", e))?;

    Ok(ExtractedQuestion {
        question: extracted.question.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::MockModel;

    fn request(uri: &str) -> ScreenshotRequest {
        ScreenshotRequest {
            photo_data_uri: uri.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_payload_returns_empty_question() {
        let model = MockModel::text(r#"{"question": "should not be used"}"#);
        let result = extract_question(&model, request("data:image/png;base64,"), &Limits::default())
            .await
            .unwrap();
        assert_eq!(result, ExtractedQuestion { question: String::new() });
        assert!(!result.is_found());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_question_is_extracted_and_image_forwarded() {
        let model = MockModel::text(r#"{"question": " What is a closure? "}"#);
        let result = extract_question(
            &model,
            request("data:image/png;base64,iVBORw0KGgo="),
            &Limits::default(),
        )
        .await
        .unwrap();
        assert_eq!(result.question, "What is a closure?");

        let sent = model.last_request().unwrap();
        assert_eq!(
            sent.parts[1],
            PromptPart::Media {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_model_finding_nothing_is_not_an_error() {
        let model = MockModel::text(r#"{"question": ""}"#);
        let result = extract_question(
            &model,
            request("data:image/jpeg;base64,/9j/4AAQ"),
            &Limits::default(),
        )
        .await
        .unwrap();
        assert!(!result.is_found());
    }

    #[tokio::test]
    async fn test_missing_capture_never_calls_model() {
        let model = MockModel::text(r#"{"question": "Q"}"#);
        let err = extract_question(&model, request(""), &Limits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_model_output_error() {
        let model = MockModel::text(r#"{"text": "Q"}"#);
        let err = extract_question(
            &model,
            request("data:image/png;base64,AAAA"),
            &Limits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }
}
