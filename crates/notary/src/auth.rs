//! Inbound request verification.
//!
//! [`Auth::authorize`] turns the `authorization` metadata of a request into
//! the caller's [`Permission`]. It never fails: every problem with the
//! credential yields [`Permission::none`], and the reason is only visible in
//! the server log. Callers see a uniform `PermissionDenied`.

use std::fmt;
use std::sync::Arc;

use notary_crypto::{PublicKey, SIGNATURE_FORMAT, Signature};
use notary_proto::{Authorization, Permission};
use notary_storage::Storage;
use tonic::Status;
use tonic::metadata::MetadataMap;
use tracing::{debug, warn};

/// Metadata key carrying the request credential.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Where verification of a credential stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Metadata,
    Decode,
    Incomplete,
    Expired,
    Lookup,
    Key,
    Signature,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Metadata => "metadata",
            Self::Decode => "decode",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Lookup => "lookup",
            Self::Key => "key",
            Self::Signature => "signature",
        };
        f.write_str(name)
    }
}

struct Rejection {
    stage: Stage,
    fingerprint: String,
    reason: String,
}

impl Rejection {
    fn new(stage: Stage, fingerprint: &str, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            fingerprint: fingerprint.to_owned(),
            reason: reason.to_string(),
        }
    }
}

fn denied() -> Status {
    Status::permission_denied("permission denied")
}

/// Verifies request credentials against a grant store.
#[derive(Clone)]
pub struct Auth {
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth").finish_non_exhaustive()
    }
}

impl Auth {
    /// Verify credentials against `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The permission granted to the caller, or none.
    pub async fn authorize(&self, metadata: &MetadataMap) -> Permission {
        match self.verify(metadata).await {
            Ok(permission) => permission,
            Err(rejection) => {
                warn!(
                    fingerprint = %rejection.fingerprint,
                    stage = %rejection.stage,
                    reason = %rejection.reason,
                    "rejected request credential"
                );
                Permission::none()
            },
        }
    }

    /// Fail with `PermissionDenied` unless the caller holds every bit of
    /// `required`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the credential is invalid or lacks a
    /// required capability.
    pub async fn require(&self, metadata: &MetadataMap, required: Permission) -> Result<(), Status> {
        if self.authorize(metadata).await.allows(&required) {
            Ok(())
        } else {
            Err(denied())
        }
    }

    async fn verify(&self, metadata: &MetadataMap) -> Result<Permission, Rejection> {
        let mut values = metadata.get_all(AUTHORIZATION_KEY).iter();
        let value = match (values.next(), values.next()) {
            (Some(value), None) => value,
            (None, _) => return Err(Rejection::new(Stage::Metadata, "", "no credential")),
            (Some(_), Some(_)) => {
                return Err(Rejection::new(Stage::Metadata, "", "multiple credentials"));
            },
        };

        let encoded = value
            .to_str()
            .map_err(|e| Rejection::new(Stage::Decode, "", e))?;
        let credential =
            Authorization::decode_metadata(encoded).map_err(|e| Rejection::new(Stage::Decode, "", e))?;

        let (Some(token), Some(signature)) = (credential.token, credential.signature) else {
            return Err(Rejection::new(Stage::Incomplete, "", "token or signature missing"));
        };
        let fingerprint = token.fingerprint.as_str();

        if token.is_expired() {
            return Err(Rejection::new(
                Stage::Expired,
                fingerprint,
                format_args!("expired at {}", token.expires),
            ));
        }

        let grant = self
            .storage
            .lookup(fingerprint)
            .await
            .map_err(|e| Rejection::new(Stage::Lookup, fingerprint, e))?;

        let key: PublicKey = grant
            .public_key()
            .map_err(|e| Rejection::new(Stage::Key, fingerprint, e))?;

        if signature.format != SIGNATURE_FORMAT {
            return Err(Rejection::new(
                Stage::Signature,
                fingerprint,
                format_args!("unsupported format {}", signature.format),
            ));
        }
        Signature::try_from_slice(&signature.data)
            .and_then(|sig| key.verify(&token.signing_payload(), &sig))
            .map_err(|e| Rejection::new(Stage::Signature, fingerprint, e))?;

        let permission = grant.permission_or_none();
        debug!(fingerprint, %permission, "authorized request");
        Ok(permission)
    }
}

type Predicate = Arc<dyn Fn(&Permission) -> Result<(), Status> + Send + Sync>;

/// [`Auth`] with a pluggable decision over the caller's permission.
#[derive(Clone)]
pub struct AuthChecker {
    auth: Auth,
    predicate: Predicate,
}

impl fmt::Debug for AuthChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthChecker").finish_non_exhaustive()
    }
}

impl AuthChecker {
    /// Check callers with `predicate`.
    pub fn new<F>(auth: Auth, predicate: F) -> Self
    where
        F: Fn(&Permission) -> Result<(), Status> + Send + Sync + 'static,
    {
        Self {
            auth,
            predicate: Arc::new(predicate),
        }
    }

    /// Require every bit of `required`.
    #[must_use]
    pub fn requiring(auth: Auth, required: Permission) -> Self {
        Self::new(auth, move |permission| {
            if permission.allows(&required) {
                Ok(())
            } else {
                Err(denied())
            }
        })
    }

    /// Require the `deploy` bit.
    #[must_use]
    pub fn deploy(auth: Auth) -> Self {
        Self::requiring(auth, Permission::DEPLOY)
    }

    /// Run the predicate over the caller's permission.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the credential is invalid, or the
    /// predicate's error.
    pub async fn check(&self, metadata: &MetadataMap) -> Result<(), Status> {
        let permission = self.auth.authorize(metadata).await;
        if permission.is_none() {
            return Err(denied());
        }
        (self.predicate)(&permission)
    }
}
