//! Proto error types.

use thiserror::Error;

/// Errors raised while interpreting wire values.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A permission name did not match any capability.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// Metadata value is not valid base64url.
    #[error("invalid base64url encoding")]
    InvalidBase64,

    /// Bytes are not a valid protobuf message.
    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Result type for proto operations.
pub type ProtoResult<T> = Result<T, ProtoError>;
