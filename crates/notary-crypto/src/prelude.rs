//! Prelude module - commonly used types for convenient import.
//!
//! Use `use notary_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use notary_crypto::prelude::*;
//!
//! let keypair = KeyPair::generate();
//! let signature = keypair.sign(b"hello");
//! assert!(keypair.verify(b"hello", &signature).is_ok());
//!
//! let fingerprint: Fingerprint = keypair.fingerprint();
//! assert_eq!(fingerprint.to_hex().len(), 64);
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Key types
pub use crate::{AuthorizedKey, KeyPair, PublicKey};

// Signature
pub use crate::{SIGNATURE_FORMAT, Signature};

// Identity
pub use crate::Fingerprint;
