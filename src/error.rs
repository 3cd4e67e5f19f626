//! Error handling module
//!
//! HTTP error type and response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Ledger errors are folded into one server-error response
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (self.to_string(), "invalid_request", Some(msg.clone()))
            }

            // 500 Internal Server Error
            AppError::Ledger(LedgerError::Persistence(msg)) => {
                // Store and driver messages stay in the log
                tracing::error!("Persistence failure: {}", msg);
                (
                    "Internal server error".to_string(),
                    "persistence_failure",
                    None,
                )
            }
            AppError::Ledger(err) if err.is_validation_error() => {
                tracing::debug!(error_code = err.code(), "Ledger request invalid: {}", err);
                (self.to_string(), err.code(), Some(err.to_string()))
            }
            AppError::Ledger(err) => {
                tracing::warn!(error_code = err.code(), "Ledger operation rejected: {}", err);
                (self.to_string(), err.code(), Some(err.to_string()))
            }
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
