//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No grant is stored under the fingerprint.
    #[error("not found: {0}")]
    NotFound(String),

    /// The fingerprint is not usable as a storage key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored grant could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// Enumeration stopped because the consumer went away.
    #[error("operation cancelled")]
    Cancelled,
}

impl StorageError {
    /// Whether this is [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
