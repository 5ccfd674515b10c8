use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use voxdesk_core::error::{self, ApiError};
use voxdesk_core::settings::{AgentSettings, SettingsField};
use voxdesk_core::sync::StoreError;
use voxdesk_core::validate::Violation;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Authentication failure (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// Settings store failed or timed out (500)
    Store(StoreError),
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The rejected value is echoed back, except for the prompt which may be long.
    pub fn from_violation(violation: Violation, settings: &AgentSettings) -> Self {
        let received = match violation.field {
            SettingsField::Prompt => None,
            field => Some(
                settings
                    .numeric(field)
                    .map(serde_json::Value::from)
                    .unwrap_or_else(|| serde_json::Value::String(settings.display_value(field))),
            ),
        };
        AppError::Validation {
            message: violation.message,
            field: Some(violation.field.to_string()),
            received,
            docs_hint: Some("Allowed values are listed at GET /v1/catalog.".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();
        let status = self.status();

        let api_error = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => ApiError {
                error: error::codes::VALIDATION_FAILED.to_string(),
                message,
                field,
                received,
                request_id,
                docs_hint,
            },
            AppError::Unauthorized { message, docs_hint } => ApiError {
                error: error::codes::UNAUTHORIZED.to_string(),
                message,
                field: None,
                received: None,
                request_id,
                docs_hint,
            },
            AppError::Store(err) => {
                tracing::error!(error = %err, "Settings store error");
                ApiError {
                    error: error::codes::STORE_UNAVAILABLE.to_string(),
                    message: "Settings could not be read or written right now".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: Some("Retry in a moment.".to_string()),
                }
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ApiError {
                    error: error::codes::INTERNAL_ERROR.to_string(),
                    message: "An internal error occurred".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                }
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}
