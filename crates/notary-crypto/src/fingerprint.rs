//! Credential fingerprints.
//!
//! A fingerprint is `hex(SHA256(public key bytes))`, where the public key
//! bytes are the canonical authorized-key line. It is always recomputed from
//! the key and never trusted when supplied by a caller.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CryptoError, CryptoResult};

/// Length of a fingerprint's hex form.
const HEX_LEN: usize = 64;

/// A SHA-256 fingerprint (32 bytes) of a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint arbitrary public key bytes.
    #[must_use]
    pub fn of(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Get the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as lowercase hex, the form used as a storage key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not 64 hex characters.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        if s.len() != HEX_LEN {
            return Err(CryptoError::InvalidHexEncoding);
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Ok(Self(bytes))
    }

    /// Whether `s` has the exact shape of a hex fingerprint.
    ///
    /// Only lowercase hex is accepted so that every fingerprint has a single
    /// spelling on disk.
    #[must_use]
    pub fn is_canonical_hex(s: &str) -> bool {
        s.len() == HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let data = b"ssh-ed25519 AAAA\n";
        let expected = hex::encode(Sha256::digest(data));
        assert_eq!(Fingerprint::of(data).to_hex(), expected);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(Fingerprint::of(b"key"), Fingerprint::of(b"key"));
        assert_ne!(Fingerprint::of(b"key"), Fingerprint::of(b"other"));
    }

    #[test]
    fn test_fingerprint_hex_roundtrip() {
        let fp = Fingerprint::of(b"key");
        let decoded = Fingerprint::from_hex(&fp.to_hex()).unwrap();
        assert_eq!(fp, decoded);
        assert!(Fingerprint::from_hex("abc").is_err());
    }

    #[test]
    fn test_canonical_hex() {
        let fp = Fingerprint::of(b"key").to_hex();
        assert!(Fingerprint::is_canonical_hex(&fp));
        assert!(!Fingerprint::is_canonical_hex(&fp.to_uppercase()));
        assert!(!Fingerprint::is_canonical_hex("../../etc/passwd"));
        assert!(!Fingerprint::is_canonical_hex(""));
    }
}
