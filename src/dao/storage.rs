use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
///
/// Both variants are transient: the repository retries them a bounded number
/// of times before surfacing the failure to the coordinator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Backend did not answer within the per-call deadline.
    #[error("storage call timed out after {waited_ms}ms")]
    Timeout {
        /// How long the call waited before giving up.
        waited_ms: u64,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
