//! Error taxonomy for the import pipeline
//!
//! Errors are split by how the pipeline reacts to them: validation and
//! not-found errors fail a task immediately, capacity errors are retried
//! with backoff, and cancellation is a cooperative abort rather than a
//! real failure.

use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur during an import
#[derive(Debug, Error)]
pub enum ImportError {
    /// Bad input shape or an empty/invalid configuration
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced space or staged file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Network/IO failure talking to the store
    #[error("store connectivity error: {0}")]
    StoreConnectivity(String),

    /// Store-side throttling or circuit breaker; retried with backoff
    #[error("store capacity error: {0}")]
    StoreCapacity(String),

    /// Non-retryable write failure (including exhausted retries)
    #[error("store write error: {0}")]
    StoreWrite(String),

    /// Cooperative abort observed at a pipeline checkpoint
    #[error("import cancelled")]
    Cancelled,

    /// Filesystem error reading staged input
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Staged input is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImportError {
    /// Whether a bulk write that failed with this error may be retried.
    ///
    /// Only transient capacity/throttling conditions qualify; everything
    /// else propagates on the first attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImportError::StoreCapacity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_capacity_errors_are_retryable() {
        assert!(ImportError::StoreCapacity("circuit breaker".into()).is_retryable());
        assert!(!ImportError::StoreWrite("mapping conflict".into()).is_retryable());
        assert!(!ImportError::StoreConnectivity("connection refused".into()).is_retryable());
        assert!(!ImportError::Validation("empty config".into()).is_retryable());
        assert!(!ImportError::Cancelled.is_retryable());
    }
}
