//! Outbound request credentials.

use std::collections::HashMap;
use std::sync::Arc;

use notary_config::KeysConfig;
use notary_crypto::{Fingerprint, KeyPair, PublicKey, SIGNATURE_FORMAT};
use notary_proto::{Authorization, Signature, Token};
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::debug;

use crate::auth::AUTHORIZATION_KEY;
use crate::error::NotaryResult;

/// Signs a fresh token for every outbound request.
///
/// Holds no mutable state; clones share the key pair.
#[derive(Debug, Clone)]
pub struct Signer {
    keypair: Arc<KeyPair>,
}

impl Signer {
    /// Wrap an existing key pair.
    #[must_use]
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Load the configured private key, generating and persisting one if
    /// the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing key file cannot be read or parsed, or
    /// a new key cannot be written.
    pub fn load(config: &KeysConfig) -> NotaryResult<Self> {
        let keypair = KeyPair::load_or_generate(&config.private_key, config.seed_bytes())?;
        debug!(
            path = %config.private_key,
            fingerprint = %keypair.fingerprint(),
            "loaded signing key"
        );
        Ok(Self::new(keypair))
    }

    /// Fingerprint of the signing key.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.keypair.fingerprint()
    }

    /// Public half of the signing key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.keypair.export_public_key()
    }

    /// Sign an explicitly built token.
    #[must_use]
    pub fn sign(&self, token: Token) -> Authorization {
        let signature = self.keypair.sign(&token.signing_payload());
        Authorization {
            token: Some(token),
            signature: Some(Signature {
                format: SIGNATURE_FORMAT.to_owned(),
                data: signature.as_bytes().to_vec(),
            }),
        }
    }

    /// Issue, sign and encode a new token. Every call yields a fresh id.
    #[must_use]
    pub fn token(&self) -> String {
        self.sign(Token::issue(self.fingerprint().to_hex()))
            .encode_metadata()
    }

    /// Per-request metadata for callers that attach credentials
    /// themselves. `uris` is accepted for interface parity and ignored.
    #[must_use]
    pub fn request_metadata(&self, _uris: &[&str]) -> HashMap<String, String> {
        HashMap::from([(AUTHORIZATION_KEY.to_owned(), self.token())])
    }

    /// Credentials are bound to a key, not to the channel, so they may be
    /// sent over plaintext transports.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn require_transport_security(&self) -> bool {
        false
    }
}

impl Interceptor for Signer {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let value: AsciiMetadataValue = self
            .token()
            .parse()
            .map_err(|_| Status::internal("credential is not valid metadata"))?;
        request.metadata_mut().insert(AUTHORIZATION_KEY, value);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use notary_crypto::Signature as RawSignature;

    use super::*;

    #[test]
    fn test_tokens_are_fresh_and_verify() {
        let signer = Signer::new(KeyPair::from_seed(b"signer"));
        let first = Authorization::decode_metadata(&signer.token()).unwrap();
        let second = Authorization::decode_metadata(&signer.token()).unwrap();

        let token = first.token.unwrap();
        assert_ne!(token.id, second.token.unwrap().id);
        assert_eq!(token.fingerprint, signer.fingerprint().to_hex());
        assert_eq!(
            token.expires.saturating_sub(token.issued),
            notary_proto::TOKEN_LIFETIME_SECS
        );

        let signature = first.signature.unwrap();
        assert_eq!(signature.format, SIGNATURE_FORMAT);
        let raw = RawSignature::try_from_slice(&signature.data).unwrap();
        assert!(
            signer
                .public_key()
                .verify(&token.signing_payload(), &raw)
                .is_ok()
        );
    }

    #[test]
    fn test_request_metadata() {
        let signer = Signer::new(KeyPair::generate());
        let metadata = signer.request_metadata(&["http://peer:7443"]);
        assert_eq!(metadata.len(), 1);
        assert!(Authorization::decode_metadata(&metadata[AUTHORIZATION_KEY]).is_ok());
        assert!(!signer.require_transport_security());
    }

    #[test]
    fn test_interceptor_sets_authorization() {
        let mut signer = Signer::new(KeyPair::generate());
        let request = signer.call(Request::new(())).unwrap();
        let value = request.metadata().get(AUTHORIZATION_KEY).unwrap();
        assert!(Authorization::decode_metadata(value.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_load_generates_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeysConfig {
            private_key: dir.path().join("id_ed25519").display().to_string(),
            seed: None,
        };
        let first = Signer::load(&config).unwrap();
        let second = Signer::load(&config).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
    }
}
