//! Error types for the CRM API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed request that is not tied to a single field rule.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Validation(err) => AppError::Validation(err),
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// Status, error code and caller-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.code(), err.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Database(err @ DatabaseError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database query failed".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, code, "Request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
