//! Authorized-keys line format.
//!
//! A line is `[options] <key-type> <base64 wire blob> [comment]`. The wire
//! blob is the SSH encoding of the key: a length-prefixed key type followed
//! by the length-prefixed raw key. Only `ssh-ed25519` keys are accepted;
//! other well-known key types are recognised so they can be reported rather
//! than misparsed as options.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;

/// The only key type notary signs and verifies with.
pub const KEY_TYPE_ED25519: &str = "ssh-ed25519";

/// Key types that may appear in an authorized-keys file.
const KNOWN_KEY_TYPES: &[&str] = &[
    KEY_TYPE_ED25519,
    "ssh-rsa",
    "ssh-dss",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// A parsed authorized-keys entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKey {
    /// The public key.
    pub key: PublicKey,
    /// Trailing free-form comment, if any.
    pub comment: Option<String>,
}

impl AuthorizedKey {
    /// Parse a single line.
    ///
    /// Returns `Ok(None)` for blank lines and `#` comments.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedAuthorizedKey`] if the line has no key
    /// type or blob, [`CryptoError::UnsupportedKeyType`] for non-ed25519 keys,
    /// or a decoding error if the blob is not a valid wire-encoded key.
    pub fn parse_line(line: &str) -> CryptoResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut fields = line
            .split_whitespace()
            .skip_while(|field| !KNOWN_KEY_TYPES.contains(field));

        let key_type = fields
            .next()
            .ok_or_else(|| CryptoError::MalformedAuthorizedKey("no key type".into()))?;
        if key_type != KEY_TYPE_ED25519 {
            return Err(CryptoError::UnsupportedKeyType(key_type.to_owned()));
        }

        let blob = fields
            .next()
            .ok_or_else(|| CryptoError::MalformedAuthorizedKey("missing key data".into()))?;
        let blob = STANDARD
            .decode(blob)
            .map_err(|_| CryptoError::InvalidBase64Encoding)?;
        let key = decode_wire_blob(&blob)?;

        let comment = fields.collect::<Vec<_>>().join(" ");
        let comment = (!comment.is_empty()).then_some(comment);

        Ok(Some(Self { key, comment }))
    }

    /// Parse the first key line found in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not UTF-8, contain no key line, or
    /// the first key line is invalid.
    pub fn parse(bytes: &[u8]) -> CryptoResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CryptoError::MalformedAuthorizedKey("not UTF-8".into()))?;
        for line in text.lines() {
            if let Some(parsed) = Self::parse_line(line)? {
                return Ok(parsed);
            }
        }
        Err(CryptoError::MalformedAuthorizedKey("no key found".into()))
    }

    /// Render as an authorized-keys line, including the comment.
    #[must_use]
    pub fn to_line(&self) -> String {
        let blob = STANDARD.encode(encode_wire_blob(self.key.as_bytes()));
        match &self.comment {
            Some(comment) => format!("{KEY_TYPE_ED25519} {blob} {comment}\n"),
            None => format!("{KEY_TYPE_ED25519} {blob}\n"),
        }
    }
}

/// SSH wire encoding of an ed25519 public key.
pub(crate) fn encode_wire_blob(key: &[u8; 32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(51);
    write_string(&mut blob, KEY_TYPE_ED25519.as_bytes());
    write_string(&mut blob, key);
    blob
}

fn decode_wire_blob(blob: &[u8]) -> CryptoResult<PublicKey> {
    let mut buf = blob;
    let key_type = read_string(&mut buf)?;
    if key_type != KEY_TYPE_ED25519.as_bytes() {
        return Err(CryptoError::MalformedAuthorizedKey(
            "key type does not match key data".into(),
        ));
    }
    let key = read_string(&mut buf)?;
    if !buf.is_empty() {
        return Err(CryptoError::MalformedAuthorizedKey(
            "trailing bytes after key data".into(),
        ));
    }
    PublicKey::try_from_slice(key)
}

#[allow(clippy::cast_possible_truncation)]
fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    // Key fields are tiny; u32 cannot truncate them.
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn read_string<'a>(buf: &mut &'a [u8]) -> CryptoResult<&'a [u8]> {
    let (len, rest) = buf
        .split_first_chunk::<4>()
        .ok_or_else(|| CryptoError::MalformedAuthorizedKey("truncated length".into()))?;
    let len = usize::try_from(u32::from_be_bytes(*len))
        .map_err(|_| CryptoError::MalformedAuthorizedKey("length overflow".into()))?;
    if rest.len() < len {
        return Err(CryptoError::MalformedAuthorizedKey("truncated field".into()));
    }
    let (value, rest) = rest.split_at(len);
    *buf = rest;
    Ok(value)
}
