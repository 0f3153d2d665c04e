//! Error type shared by the request handlers and the background worker.
//!
//! On the request path these errors become HTTP responses through
//! `ResponseError`. On the worker path they are logged and recorded as the
//! job's `Failed` status; nothing is sent back to the user who submitted the edit.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MassEditError {
    #[error("You do not have permission to change these records")]
    PermissionDenied,

    #[error("{0}")]
    NotFound(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown field '{field}' on {model}")]
    UnknownField { model: String, field: String },

    #[error("Invalid record identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("No records were selected")]
    EmptySelection,

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for MassEditError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                MassEditError::Integrity(message.unwrap_or_else(|| failure.to_string()))
            }
            other => MassEditError::Database(other),
        }
    }
}

impl MassEditError {
    fn code(&self) -> &'static str {
        match self {
            MassEditError::PermissionDenied => "PERMISSION_DENIED",
            MassEditError::NotFound(_) => "NOT_FOUND",
            MassEditError::Integrity(_) => "INTEGRITY_ERROR",
            MassEditError::Validation(_) => "VALIDATION_ERROR",
            MassEditError::UnknownField { .. } => "UNKNOWN_FIELD",
            MassEditError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            MassEditError::EmptySelection => "EMPTY_SELECTION",
            MassEditError::Registry(_) => "REGISTRY_ERROR",
            MassEditError::Config(_) => "CONFIG_ERROR",
            MassEditError::Database(_) => "DATABASE_ERROR",
            MassEditError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl ResponseError for MassEditError {
    fn status_code(&self) -> StatusCode {
        match self {
            MassEditError::PermissionDenied => StatusCode::FORBIDDEN,
            MassEditError::NotFound(_) => StatusCode::NOT_FOUND,
            MassEditError::Integrity(_) => StatusCode::CONFLICT,
            MassEditError::Validation(_)
            | MassEditError::UnknownField { .. }
            | MassEditError::InvalidIdentifier(_)
            | MassEditError::EmptySelection => StatusCode::BAD_REQUEST,
            MassEditError::Registry(_)
            | MassEditError::Config(_)
            | MassEditError::Database(_)
            | MassEditError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Storage details stay in the logs.
        let message = match self {
            MassEditError::Database(_) => "Database operation failed".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
