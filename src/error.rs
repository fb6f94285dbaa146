//! Error types for feedpin.

use thiserror::Error;

/// Common error type for feedpin.
#[derive(Error, Debug)]
pub enum FeedpinError {
    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feed fetch or parse error for a single feed.
    #[error("feed error: {0}")]
    Fetch(String),

    /// The external posting service rejected or failed a call.
    #[error("external service error: {0}")]
    External(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),
}

impl From<sqlx::Error> for FeedpinError {
    fn from(e: sqlx::Error) -> Self {
        FeedpinError::Database(e.to_string())
    }
}

/// Result type alias for feedpin operations.
pub type Result<T> = std::result::Result<T, FeedpinError>;
