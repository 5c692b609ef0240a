use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single violated field constraint, surfaced verbatim to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Client-correctable field errors; carries every violation, not just
    /// the first one encountered.
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationFailed(fields) => {
                let body = Json(json!({
                    "error": "validation failed",
                    "fields": fields,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            AppError::Conflict(msg) => error_body(StatusCode::CONFLICT, &msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "error": message
    }));
    (status, body).into_response()
}
