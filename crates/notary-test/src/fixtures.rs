//! Test fixtures for keys and grants.

use notary::Signer;
use notary_crypto::KeyPair;
use notary_proto::{Grant, Permission};

/// Create a random test key pair.
#[must_use]
pub fn test_keypair() -> KeyPair {
    KeyPair::generate()
}

/// The fixed admin key pair; the same on every call.
#[must_use]
pub fn admin_keypair() -> KeyPair {
    KeyPair::from_seed(b"notary-test-admin")
}

/// Create a signer for a random key.
#[must_use]
pub fn test_signer() -> Signer {
    Signer::new(test_keypair())
}

/// A grant binding `signer`'s key to `permission`.
#[must_use]
pub fn grant_for(signer: &Signer, permission: Permission) -> Grant {
    Grant::for_key(&signer.public_key(), permission)
}

/// A grant for a fresh random key.
#[must_use]
pub fn test_grant(permission: Permission) -> Grant {
    Grant::for_key(&test_keypair().export_public_key(), permission)
}

/// `count` grants for fresh random keys, with no permissions.
#[must_use]
pub fn test_grants(count: usize) -> Vec<Grant> {
    (0..count).map(|_| test_grant(Permission::none())).collect()
}

/// A signer for [`admin_keypair`] and the grant that makes it an admin.
#[must_use]
pub fn admin() -> (Signer, Grant) {
    let signer = Signer::new(admin_keypair());
    let grant = grant_for(&signer, Permission::all());
    (signer, grant)
}
