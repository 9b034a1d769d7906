use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Joined field-level messages. Raised before any model call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The model answered, but without a usable payload.
    #[error("Model output error: {0}")]
    ModelOutput(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, shared by the HTTP body and `HttpBackend`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ModelOutput(_) => "MODEL_OUTPUT_ERROR",
            AppError::Streaming(_) => "STREAMING_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Rebuilds an error from a `{code, message}` pair returned by the API.
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "NOT_FOUND" => AppError::NotFound(message),
            "VALIDATION_ERROR" => AppError::Validation(message),
            "MODEL_OUTPUT_ERROR" => AppError::ModelOutput(message),
            "STREAMING_ERROR" => AppError::Streaming(message),
            "LLM_ERROR" => AppError::Llm(message),
            "STORAGE_ERROR" => AppError::Storage(message),
            _ => AppError::Internal(anyhow::anyhow!(message)),
        }
    }

    /// Message suitable for showing to the user in a notification.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::ModelOutput(msg)
            | AppError::Streaming(msg) => msg.clone(),
            AppError::Llm(_) => "An AI processing error occurred".to_string(),
            AppError::Storage(_) => "A storage error occurred".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ModelOutput(msg) => {
                tracing::error!("Model output error: {msg}");
                StatusCode::BAD_GATEWAY
            }
            AppError::Streaming(msg) => {
                tracing::error!("Streaming error: {msg}");
                StatusCode::BAD_GATEWAY
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.user_message()
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::Validation("Role is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_model_output_maps_to_bad_gateway() {
        let response = AppError::ModelOutput("no media".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_llm_details_are_not_leaked_to_users() {
        let err = AppError::Llm("API error (status 401): bad key".to_string());
        assert_eq!(err.user_message(), "An AI processing error occurred");
    }

    #[test]
    fn test_code_round_trips_through_from_code() {
        let err = AppError::from_code("VALIDATION_ERROR", "too short".to_string());
        assert!(matches!(err, AppError::Validation(ref m) if m == "too short"));
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_unknown_code_becomes_internal() {
        let err = AppError::from_code("SOMETHING_ELSE", "boom".to_string());
        assert!(matches!(err, AppError::Internal(_)));
    }
}
