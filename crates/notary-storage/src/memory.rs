//! In-memory grant store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use notary_proto::Grant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, StorageResult};
use crate::storage::{self, Storage, SyncStorage};

/// Grants held in a `HashMap` keyed by fingerprint.
///
/// Used directly in tests and as the snapshot type behind [`File`](crate::File).
#[derive(Debug, Default)]
pub struct Memory {
    grants: RwLock<HashMap<String, Grant>>,
}

impl Memory {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `grants`, normalising each one.
    ///
    /// Later grants replace earlier ones with the same fingerprint.
    #[must_use]
    pub fn from_grants(grants: impl IntoIterator<Item = Grant>) -> Self {
        let grants = grants
            .into_iter()
            .map(|grant| {
                let grant = grant.with_defaults();
                (grant.fingerprint.clone(), grant)
            })
            .collect();
        Self {
            grants: RwLock::new(grants),
        }
    }

    /// Number of stored grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.read().map_or(0, |grants| grants.len())
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out every stored grant.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn snapshot(&self) -> StorageResult<Vec<Grant>> {
        let grants = self
            .grants
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(grants.values().cloned().collect())
    }
}

#[async_trait]
impl Storage for Memory {
    async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
        let grants = self
            .grants
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        grants
            .get(fingerprint)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(fingerprint.to_owned()))
    }

    async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
        let grant = grant.with_defaults();
        let mut grants = self
            .grants
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        grants.insert(grant.fingerprint.clone(), grant.clone());
        Ok(grant)
    }

    async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
        let key = grant.storage_key();
        let mut grants = self
            .grants
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        grants.remove(&key).ok_or(StorageError::NotFound(key))
    }
}

#[async_trait]
impl SyncStorage for Memory {
    async fn sync(&self, tx: mpsc::Sender<Grant>, cancel: CancellationToken) -> StorageResult<()> {
        let grants = self.snapshot()?;
        storage::send_all(grants, &tx, &cancel).await
    }
}
