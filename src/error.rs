use crate::{api::ApiError, database::CacheError};
use thiserror::Error;

/// Errors surfaced by the ranking engine and everything built on it.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Unknown player or song
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service rejected the call or could not be reached.
    /// Fatal to the refresh in progress; callers may resubmit.
    #[error("API call failed: {0}")]
    ApiFailure(#[from] ApiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cached data violates an invariant. Never retried.
    #[error("Score cache is corrupted: {0}")]
    CacheCorruption(String),

    #[error("Score cache error: {0}")]
    Cache(CacheError)
}

impl From<CacheError> for ProcessorError {
    fn from(value: CacheError) -> Self {
        match value {
            CacheError::Corruption(msg) => ProcessorError::CacheCorruption(msg),
            other => ProcessorError::Cache(other)
        }
    }
}
