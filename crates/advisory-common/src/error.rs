//! Error types for advisory-dashboard services.

use thiserror::Error;

/// Result type alias using AdvisoryError.
pub type AdvisoryResult<T> = Result<T, AdvisoryError>;

/// Primary error type for ingestion and storage operations.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to parse upstream payload: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<std::io::Error> for AdvisoryError {
    fn from(err: std::io::Error) -> Self {
        AdvisoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AdvisoryError {
    fn from(err: serde_json::Error) -> Self {
        AdvisoryError::Parse(err.to_string())
    }
}
