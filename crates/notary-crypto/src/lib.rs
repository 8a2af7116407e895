//! Notary Crypto - key material for the notary credential subsystem.
//!
//! This crate provides:
//! - Ed25519 key pairs, persisted as PEM and loaded or generated on first use
//! - Public keys in authorized-keys line format (`ssh-ed25519 AAAA... comment`)
//! - Signatures over deterministic token payloads
//! - SHA-256 fingerprints, the stable identity of a credential
//!
//! # Example
//!
//! ```
//! use notary_crypto::{Fingerprint, KeyPair};
//!
//! let keypair = KeyPair::generate();
//! let public = keypair.export_public_key();
//!
//! // The fingerprint is derived from the canonical authorized-key line.
//! let line = public.to_authorized_key();
//! assert_eq!(public.fingerprint(), Fingerprint::of(line.as_bytes()));
//!
//! let signature = keypair.sign(b"payload");
//! assert!(public.verify(b"payload", &signature).is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod authorized_key;
pub mod prelude;

mod error;
mod fingerprint;
mod keypair;
mod signature;

pub use authorized_key::AuthorizedKey;
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::Fingerprint;
pub use keypair::{KeyPair, PublicKey, public_key_path};
pub use signature::{SIGNATURE_FORMAT, Signature};
