//! Ranked cache error types.

use thiserror::Error;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Member stored in the cache is not a user id
    #[error("Invalid cache member: {0}")]
    InvalidMember(String),

    /// Cache cannot be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
