//! Request credentials: token issue, signing payload and metadata codec.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::Utc;
use prost::Message;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{ProtoError, ProtoResult};
use crate::messages::{Authorization, Token};

/// Seconds a token stays valid after issue.
pub const TOKEN_LIFETIME_SECS: i64 = 10;

/// Length of a token id in bytes.
pub const TOKEN_ID_LEN: usize = 16;

/// Version of the signing payload format.
/// Increment this when the payload layout changes.
const SIGNING_DATA_VERSION: u8 = 0x01;

/// Write a length-prefixed byte slice to the output buffer.
///
/// Format: 4-byte little-endian length followed by the data.
#[allow(clippy::cast_possible_truncation)]
fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    // Token fields are small; lengths never approach u32::MAX.
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// Current time in unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

impl Token {
    /// Issue a fresh token for `fingerprint`, valid from now for
    /// [`TOKEN_LIFETIME_SECS`].
    #[must_use]
    pub fn issue(fingerprint: impl Into<String>) -> Self {
        Self::issue_at(fingerprint, unix_now())
    }

    /// Issue a token as if the current time were `now`.
    #[must_use]
    pub fn issue_at(fingerprint: impl Into<String>, now: i64) -> Self {
        let mut id = vec![0u8; TOKEN_ID_LEN];
        OsRng.fill_bytes(&mut id);
        Self {
            id,
            fingerprint: fingerprint.into(),
            issued: now,
            expires: now.saturating_add(TOKEN_LIFETIME_SECS),
        }
    }

    /// The bytes a signature covers.
    ///
    /// Format (v1):
    /// - 1 byte: version (0x01)
    /// - Length-prefixed token id
    /// - Length-prefixed fingerprint (UTF-8)
    /// - 8 bytes: `issued` (i64 LE)
    /// - 8 bytes: `expires` (i64 LE)
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(128);
        data.push(SIGNING_DATA_VERSION);
        write_length_prefixed(&mut data, &self.id);
        write_length_prefixed(&mut data, self.fingerprint.as_bytes());
        data.extend_from_slice(&self.issued.to_le_bytes());
        data.extend_from_slice(&self.expires.to_le_bytes());
        data
    }

    /// Whether the token is past its expiry at `now`. There is no leeway:
    /// a token is still valid in the second it expires.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires
    }

    /// Whether the token is past its expiry now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

impl Authorization {
    /// Protobuf-encode and base64url (padded) the credential for the
    /// `authorization` metadata entry.
    #[must_use]
    pub fn encode_metadata(&self) -> String {
        URL_SAFE.encode(self.encode_to_vec())
    }

    /// Inverse of [`Authorization::encode_metadata`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::InvalidBase64`] or [`ProtoError::Decode`] if the
    /// value is not a well-formed credential.
    pub fn decode_metadata(value: &str) -> ProtoResult<Self> {
        let bytes = URL_SAFE
            .decode(value.trim())
            .map_err(|_| ProtoError::InvalidBase64)?;
        Ok(Self::decode(bytes.as_slice())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Signature;

    #[test]
    fn test_issue_sets_lifetime() {
        let token = Token::issue_at("abc", 1_000);
        assert_eq!(token.issued, 1_000);
        assert_eq!(token.expires, 1_010);
        assert_eq!(token.id.len(), TOKEN_ID_LEN);
        assert_eq!(token.fingerprint, "abc");
    }

    #[test]
    fn test_ids_are_fresh() {
        let a = Token::issue("abc");
        let b = Token::issue("abc");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_expiry_has_no_leeway() {
        let token = Token::issue_at("abc", 100);
        assert!(!token.is_expired_at(100));
        assert!(!token.is_expired_at(110));
        assert!(token.is_expired_at(111));
    }

    #[test]
    fn test_is_expired_uses_wall_clock() {
        assert!(!Token::issue("abc").is_expired());
        let stale = Token::issue_at("abc", unix_now().saturating_sub(60));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_signing_payload_layout() {
        let token = Token {
            id: vec![0xAA; 2],
            fingerprint: "ff".into(),
            issued: 1,
            expires: 2,
        };
        let payload = token.signing_payload();

        let mut expected = vec![0x01];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&[0xAA, 0xAA]);
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"ff");
        expected.extend_from_slice(&1i64.to_le_bytes());
        expected.extend_from_slice(&2i64.to_le_bytes());
        assert_eq!(payload, expected);
    }

    #[test]
    fn test_signing_payload_binds_every_field() {
        let token = Token::issue_at("abc", 10);
        let base = token.signing_payload();

        let mut other = token.clone();
        other.expires = other.expires.saturating_add(1);
        assert_ne!(other.signing_payload(), base);

        let mut other = token.clone();
        other.fingerprint = "abd".into();
        assert_ne!(other.signing_payload(), base);

        let mut other = token;
        other.id[0] ^= 1;
        assert_ne!(other.signing_payload(), base);
    }

    #[test]
    fn test_metadata_round_trip() {
        let auth = Authorization {
            token: Some(Token::issue("abc")),
            signature: Some(Signature {
                format: "ssh-ed25519".into(),
                data: vec![7; 64],
            }),
        };
        let encoded = auth.encode_metadata();
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(Authorization::decode_metadata(&encoded).unwrap(), auth);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Authorization::decode_metadata("not base64!"),
            Err(ProtoError::InvalidBase64)
        ));
        // Valid base64, invalid protobuf (truncated length-delimited field).
        let garbage = URL_SAFE.encode([0x0A, 0x05, 0x01]);
        assert!(matches!(
            Authorization::decode_metadata(&garbage),
            Err(ProtoError::Decode(_))
        ));
    }
}
