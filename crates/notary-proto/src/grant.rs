//! Grant normalisation.

use notary_crypto::{CryptoResult, Fingerprint, PublicKey};

use crate::messages::{Grant, Permission};

impl Grant {
    /// Build a normalised grant for `key`.
    #[must_use]
    pub fn for_key(key: &PublicKey, permission: Permission) -> Self {
        let mut grant = Self {
            authorization: key.to_authorized_key().into_bytes(),
            permission: Some(permission),
            fingerprint: String::new(),
        };
        grant.ensure_defaults();
        grant
    }

    /// Normalise the grant in place.
    ///
    /// A missing permission becomes [`Permission::none`]. An authorization
    /// that parses as an authorized-key line is rewritten to its canonical
    /// form, dropping options and comment. The fingerprint is always
    /// recomputed from the resulting authorization bytes, so a caller cannot
    /// bind a key to someone else's fingerprint. Applying this twice is the
    /// same as applying it once.
    pub fn ensure_defaults(&mut self) {
        if self.permission.is_none() {
            self.permission = Some(Permission::none());
        }
        if let Ok(key) = PublicKey::from_authorized_key(&self.authorization) {
            self.authorization = key.to_authorized_key().into_bytes();
        }
        self.fingerprint = Fingerprint::of(&self.authorization).to_hex();
    }

    /// Builder form of [`Grant::ensure_defaults`].
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.ensure_defaults();
        self
    }

    /// The key a store files this grant under.
    ///
    /// Uses the stored fingerprint, or derives one from the authorization
    /// when the fingerprint is empty.
    #[must_use]
    pub fn storage_key(&self) -> String {
        if self.fingerprint.is_empty() && !self.authorization.is_empty() {
            return self.clone().with_defaults().fingerprint;
        }
        self.fingerprint.clone()
    }

    /// The grant's permission, treating absence as none.
    #[must_use]
    pub fn permission_or_none(&self) -> Permission {
        self.permission.unwrap_or_default()
    }

    /// Parse the grant's public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization is not a valid ed25519
    /// authorized-key line.
    pub fn public_key(&self) -> CryptoResult<PublicKey> {
        PublicKey::from_authorized_key(&self.authorization)
    }
}
