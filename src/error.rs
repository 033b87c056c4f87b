use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for Ontograph
#[derive(Error, Debug)]
pub enum OntographError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lookup by primary key failed
    #[error("{0}")]
    NotFound(String),

    /// Malformed input or a reference to a record that does not exist
    #[error("{0}")]
    InvalidInput(String),

    /// Unique name already taken
    #[error("{0}")]
    Duplicate(String),

    /// Plugin module errors
    #[error("Module error: {0}")]
    Module(String),
}

/// Convenient Result type using OntographError
pub type Result<T> = std::result::Result<T, OntographError>;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl OntographError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OntographError::NotFound(_) => StatusCode::NOT_FOUND,
            OntographError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            OntographError::Duplicate(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            OntographError::NotFound(_) => "NOT_FOUND",
            OntographError::InvalidInput(_) => "BAD_REQUEST",
            OntographError::Duplicate(_) => "DUPLICATE",
            OntographError::Database(_) => "DATABASE_ERROR",
            OntographError::Module(_) => "MODULE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for OntographError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OntographError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: OntographError = rusqlite_err.into();
        assert!(matches!(err, OntographError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OntographError = io_err.into();
        assert!(matches!(err, OntographError::Io(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            OntographError::NotFound("Entity not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            OntographError::InvalidInput("bad ids".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OntographError::Duplicate("Entity type already exists".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_found_message_is_bare() {
        let err = OntographError::NotFound("Entity not found".to_string());
        assert_eq!(err.to_string(), "Entity not found");
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
