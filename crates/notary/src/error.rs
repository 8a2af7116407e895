//! Notary error types.

use notary_crypto::CryptoError;
use notary_proto::ProtoError;
use notary_storage::StorageError;
use thiserror::Error;
use tonic::Status;

/// Errors raised by the notary services, clients and replicator.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Key material could not be loaded or used.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A wire value could not be interpreted.
    #[error("proto error: {0}")]
    Proto(#[from] ProtoError),

    /// A storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A connection could not be established.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// A remote call returned an error status.
    #[error("rpc error: {0}")]
    Status(Box<Status>),

    /// A Bloom filter could not be decoded.
    #[error("invalid bloom filter: {0}")]
    InvalidBloom(String),

    /// A peer address is not a valid URI.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
}

impl From<Status> for NotaryError {
    fn from(status: Status) -> Self {
        Self::Status(Box::new(status))
    }
}

/// Result type for notary operations.
pub type NotaryResult<T> = Result<T, NotaryError>;

/// Map a storage failure onto the status a caller sees.
#[must_use]
pub fn storage_status(err: StorageError) -> Status {
    match err {
        StorageError::NotFound(key) => Status::not_found(format!("grant not found: {key}")),
        StorageError::InvalidKey(key) => Status::invalid_argument(format!("invalid key: {key}")),
        other => Status::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use tonic::Code;

    use super::*;

    #[test]
    fn test_storage_status_mapping() {
        assert_eq!(
            storage_status(StorageError::NotFound("abc".into())).code(),
            Code::NotFound
        );
        assert_eq!(
            storage_status(StorageError::InvalidKey("../x".into())).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            storage_status(StorageError::Internal("boom".into())).code(),
            Code::Internal
        );
        assert_eq!(storage_status(StorageError::Cancelled).code(), Code::Internal);
    }

    #[test]
    fn test_status_is_boxed() {
        let err = NotaryError::from(Status::unavailable("down"));
        assert!(matches!(err, NotaryError::Status(status) if status.code() == Code::Unavailable));
    }
}
