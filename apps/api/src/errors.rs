use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::guard::GuardError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// A response is always either clean accepted text or one of these —
/// partial or garbled text never stands in for an error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Completion gateway error: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Ciphertext(#[from] GuardError),

    #[error("Validation exhausted: {0}")]
    ValidationExhausted(String),

    #[error("Outline service error: {0}")]
    Service(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "The service is misconfigured".to_string(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("Completion gateway error: {e}");
                let code = match e {
                    LlmError::Configuration(_) => "CONFIGURATION_ERROR",
                    LlmError::Http(_) | LlmError::Transport { .. } => "UPSTREAM_TRANSPORT_ERROR",
                    LlmError::Decode(_) => "UPSTREAM_DECODE_ERROR",
                    LlmError::EmptyContent => "UPSTREAM_EMPTY_CONTENT",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "The completion service failed".to_string(),
                )
            }
            AppError::Ciphertext(e) => {
                tracing::error!("Payload guard tripped: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_RETURNED_CIPHERTEXT",
                    "The completion service returned an undecryptable payload".to_string(),
                )
            }
            AppError::ValidationExhausted(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_EXHAUSTED",
                msg.clone(),
            ),
            AppError::Service(msg) => {
                tracing::error!("Outline service error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVICE_ERROR",
                    "Outline generation failed after model fallback".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes_per_variant() {
        assert_eq!(
            status_of(AppError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Llm(LlmError::EmptyContent)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Service("upstream".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Ciphertext(GuardError::ModelReturnedCiphertext)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::ValidationExhausted("spent".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
