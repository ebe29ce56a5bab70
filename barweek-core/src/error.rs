//! Error types for barweek.

use thiserror::Error;

/// Errors that can occur in barweek operations.
#[derive(Error, Debug)]
pub enum BarweekError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("This operation requires a signed-in account")]
    NotAuthenticated,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BarweekError {
    fn from(err: serde_json::Error) -> Self {
        BarweekError::Serialization(err.to_string())
    }
}

/// Result type alias for barweek operations.
pub type BarweekResult<T> = Result<T, BarweekError>;
