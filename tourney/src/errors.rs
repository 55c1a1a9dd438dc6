//! Service error taxonomy shared by the engine, projections and user service.

use thiserror::Error;

use crate::cache::CacheError;
use crate::store::StoreError;

/// Errors returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No row for the identifier
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Illegal state transition
    #[error("{0}")]
    Conflict(String),

    /// Balance below the required amount
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// Durable store failure; the transaction was rolled back
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Ranked cache failure. Any durable change made by the operation is
    /// already committed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Coarse error category, stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InsufficientFunds,
    Store,
    Cache,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Store => "store",
            ErrorKind::Cache => "cache",
        }
    }
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            ServiceError::Store(_) => ErrorKind::Store,
            ServiceError::Cache(_) => ErrorKind::Cache,
        }
    }

    /// Get a client-safe error message that doesn't leak backend details
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Store(_) => "Internal server error".to_string(),
            ServiceError::Cache(_) => {
                "Change saved but the leaderboard cache could not be updated".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => ServiceError::Conflict(format!("{what} already exists")),
            other => ServiceError::Store(other),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
