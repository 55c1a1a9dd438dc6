//! Durable store error types.

use thiserror::Error;

use crate::db::timeouts::TimeoutError;
use crate::models::ParseStatusError;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated
    #[error("Duplicate {0}")]
    Duplicate(String),

    /// Persisted value could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] ParseStatusError),

    /// Non-database backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Query exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(after) => Self::Timeout(after),
            TimeoutError::Database(e) => Self::Database(e),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
