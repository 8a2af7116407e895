//! Ed25519 key pairs with secure memory handling.
//!
//! A node's key pair is its identity: the signer mints tokens with it and
//! every peer resolves the matching public key by fingerprint.
//!
//! On disk the private key is a PEM document (tag `PRIVATE KEY`, 32-byte
//! secret) and the public key sits next to it at `<path>.pub` as an
//! authorized-keys line.

use std::io::Write;
use std::path::{Path, PathBuf};

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::authorized_key::AuthorizedKey;
use crate::error::{CryptoError, CryptoResult};
use crate::fingerprint::Fingerprint;
use crate::signature::Signature;

/// PEM tag of the private key file.
const PEM_TAG: &str = "PRIVATE KEY";

/// Comment written after the public key in `<path>.pub`.
const PUBLIC_KEY_COMMENT: &str = "notary";

/// Path of the public key file that accompanies a private key file.
#[must_use]
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut name = private_key.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}

/// An Ed25519 key pair with secure memory handling.
///
/// The secret key is zeroized on drop to prevent leaking sensitive material.
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)] // VerifyingKey doesn't implement Zeroize
    verifying_key: VerifyingKey,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            verifying_key,
            signing_key,
        }
    }

    /// Derive a key pair deterministically from a seed or preshared secret.
    ///
    /// The secret key is `SHA256(seed)`, so every node configured with the
    /// same seed holds the same identity.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut secret: [u8; 32] = [0u8; 32];
        secret.copy_from_slice(&Sha256::digest(seed));
        let signing_key = SigningKey::from_bytes(&secret);
        secret.zeroize();
        let verifying_key = signing_key.verifying_key();
        Self {
            verifying_key,
            signing_key,
        }
    }

    /// Create from a secret key (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn from_secret_key(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(bytes);

        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();

        // Zeroize the temporary buffer
        secret.zeroize();

        Ok(Self {
            verifying_key,
            signing_key,
        })
    }

    /// Parse a PEM-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPem`] if the document is malformed or has
    /// the wrong tag, or [`CryptoError::InvalidKeyLength`] for a bad payload.
    pub fn from_pem(pem_str: &str) -> CryptoResult<Self> {
        let pem = pem::parse(pem_str).map_err(|e| CryptoError::InvalidPem(e.to_string()))?;
        if pem.tag() != PEM_TAG {
            return Err(CryptoError::InvalidPem(format!(
                "expected tag {PEM_TAG}, got {}",
                pem.tag()
            )));
        }
        let contents = Zeroizing::new(pem.into_contents());
        Self::from_secret_key(&contents)
    }

    /// Encode the private key as PEM.
    #[must_use]
    pub fn to_pem(&self) -> Zeroizing<String> {
        let pem = pem::Pem::new(PEM_TAG, self.secret_key_bytes().to_vec());
        Zeroizing::new(pem::encode(&pem))
    }

    /// Get the public key bytes (32 bytes).
    #[must_use]
    pub fn public_key_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Fingerprint of this key pair's public key.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.export_public_key().fingerprint()
    }

    /// Sign a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature::from(sig)
    }

    /// Verify a signature (convenience method using our public key).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        signature.verify(message, self.public_key_bytes())
    }

    /// Export the public key for serialization.
    #[must_use]
    pub fn export_public_key(&self) -> PublicKey {
        PublicKey::from_bytes(*self.public_key_bytes())
    }

    /// Export the secret key bytes (careful - sensitive!).
    ///
    /// This should only be used for secure storage.
    #[must_use]
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Load an existing key from a file, or create and save a new one.
    ///
    /// If the file exists it is parsed as PEM. If it does not, a key pair is
    /// derived from `seed` (when given) or generated randomly, then written
    /// atomically with 0o600 permissions on Unix together with a public key
    /// file at [`public_key_path`]. The public key file is recreated if it
    /// has gone missing.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Security
    ///
    /// - A new key is written to a 0o600 temp file beside `path` and linked
    ///   into place without clobbering, so the key file is either absent or
    ///   complete.
    /// - Refuses to read key files that are symlinks (symlink attack protection).
    /// - File read buffers are wrapped in `Zeroizing` so secret key
    ///   material is cleared from memory when no longer needed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] on I/O failures or symlink detection,
    /// and a PEM or key-length error if an existing file is corrupt. A missing
    /// file is never an error.
    pub fn load_or_generate(path: impl AsRef<Path>, seed: Option<&[u8]>) -> CryptoResult<Self> {
        let path = path.as_ref();

        // Create parent directories if needed.
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CryptoError::IoError(e.to_string()))?;
        }

        let create = || match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::generate(),
        };

        if let Some(kp) = Self::persist_new(path, create)? {
            kp.write_public_key(path)?;
            tracing::info!(
                path = %path.display(),
                fingerprint = %kp.fingerprint(),
                "generated new key pair"
            );
            return Ok(kp);
        }

        // --- Read path ---

        // Refuse symlinks (prevents symlink attacks redirecting to another file).
        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::IoError(e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::IoError(
                "refusing to read key file: path is a symlink".into(),
            ));
        }

        // Read with zeroizing wrapper so secret bytes are cleared on drop.
        let contents = Zeroizing::new(
            std::fs::read_to_string(path).map_err(|e| CryptoError::IoError(e.to_string()))?,
        );
        let kp = Self::from_pem(&contents)?;

        if !public_key_path(path).exists() {
            kp.write_public_key(path)?;
        }

        Ok(kp)
    }

    /// Write a freshly created key to `path` unless a file already exists
    /// there. Returns `None` when the path is taken.
    fn persist_new(path: &Path, create: impl FnOnce() -> Self) -> CryptoResult<Option<Self>> {
        if std::fs::symlink_metadata(path).is_ok() {
            return Ok(None);
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| CryptoError::IoError(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| CryptoError::IoError(e.to_string()))?;
        }

        let kp = create();
        tmp.write_all(kp.to_pem().as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CryptoError::IoError(e.to_string()))?;

        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(Some(kp)),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(CryptoError::IoError(e.error.to_string())),
        }
    }

    /// Write the public key file for the private key at `private_key`.
    fn write_public_key(&self, private_key: &Path) -> CryptoResult<()> {
        let line = AuthorizedKey {
            key: self.export_public_key(),
            comment: Some(PUBLIC_KEY_COMMENT.to_owned()),
        }
        .to_line();
        let path = public_key_path(private_key);
        std::fs::write(&path, line).map_err(|e| CryptoError::IoError(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
                .map_err(|e| CryptoError::IoError(e.to_string()))?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// A public key (safe to share, serialize, etc.).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse the public key out of authorized-key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes hold no valid ed25519 key line.
    pub fn from_authorized_key(bytes: &[u8]) -> CryptoResult<Self> {
        AuthorizedKey::parse(bytes).map(|entry| entry.key)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The canonical authorized-key line: key type and blob, no comment,
    /// newline terminated. These are the bytes a grant stores and the bytes
    /// a fingerprint is computed over.
    #[must_use]
    pub fn to_authorized_key(&self) -> String {
        AuthorizedKey {
            key: *self,
            comment: None,
        }
        .to_line()
    }

    /// Fingerprint of the canonical authorized-key line.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.to_authorized_key().as_bytes())
    }

    /// Encode as hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature against this public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        signature.verify(message, &self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_authorized_key().trim_end())
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
