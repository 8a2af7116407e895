//! One-file-per-grant store.
//!
//! Layout: `root/<fingerprint>`, each file a single length-delimited
//! protobuf [`Grant`]. Only canonical fingerprints (64 lowercase hex
//! characters) are accepted as file names, which also keeps lookups from
//! escaping `root`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notary_crypto::Fingerprint;
use notary_proto::Grant;
use prost::Message;
use tokio::io::AsyncWriteExt;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::storage::{self, Storage, SyncStorage};

/// Grants stored as files under a root directory.
#[derive(Debug)]
pub struct Directory {
    root: PathBuf,
    lock: RwLock<()>,
}

impl Directory {
    /// Use `root` as the store. The directory is created on first insert.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    /// Use `root` as the store, creating it now.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, fingerprint: &str) -> StorageResult<PathBuf> {
        if !Fingerprint::is_canonical_hex(fingerprint) {
            return Err(StorageError::InvalidKey(format!(
                "not a canonical fingerprint: {fingerprint:?}"
            )));
        }
        Ok(self.root.join(fingerprint))
    }

    /// Read and decode one grant file. Caller holds the lock.
    async fn read(&self, fingerprint: &str) -> StorageResult<Grant> {
        let path = self.path_for(fingerprint)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(fingerprint.to_owned()));
            },
            Err(e) => return Err(e.into()),
        };
        Grant::decode_length_delimited(bytes.as_slice())
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Fingerprints currently on disk.
    async fn fingerprints(&self) -> StorageResult<Vec<String>> {
        let _guard = self.lock.read().await;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) if Fingerprint::is_canonical_hex(&name) => names.push(name),
                other => debug!(name = ?other, "Skipping non-grant entry"),
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl Storage for Directory {
    async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
        let _guard = self.lock.read().await;
        self.read(fingerprint).await
    }

    async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
        let grant = grant.with_defaults();
        let path = self.path_for(&grant.fingerprint)?;
        let bytes = grant.encode_length_delimited_to_vec();

        let _guard = self.lock.write().await;
        tokio::fs::create_dir_all(&self.root).await?;
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;

        debug!(fingerprint = %grant.fingerprint, path = %path.display(), "Stored grant");
        Ok(grant)
    }

    async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
        let fingerprint = grant.storage_key();
        let path = self.path_for(&fingerprint)?;

        let _guard = self.lock.write().await;
        let existing = self.read(&fingerprint).await?;
        tokio::fs::remove_file(&path).await?;

        debug!(fingerprint = %fingerprint, "Removed grant");
        Ok(existing)
    }
}

#[async_trait]
impl SyncStorage for Directory {
    async fn sync(&self, tx: mpsc::Sender<Grant>, cancel: CancellationToken) -> StorageResult<()> {
        for fingerprint in self.fingerprints().await? {
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
            match self.lookup(&fingerprint).await {
                Ok(grant) => storage::send_one(grant, &tx, &cancel).await?,
                // Removed since the listing.
                Err(StorageError::NotFound(_)) => {},
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notary_crypto::KeyPair;
    use notary_proto::Permission;
    use tempfile::TempDir;

    use super::*;

    fn grant(seed: &str) -> Grant {
        Grant::for_key(
            &KeyPair::from_seed(seed.as_bytes()).export_public_key(),
            Permission::GRANT,
        )
    }

    #[tokio::test]
    async fn test_insert_writes_one_file_per_grant() {
        let dir = TempDir::new().unwrap();
        let store = Directory::new(dir.path().join("grants"));

        let stored = store.insert(grant("alice")).await.unwrap();
        let path = dir.path().join("grants").join(&stored.fingerprint);
        let bytes = std::fs::read(path).unwrap();
        let decoded = Grant::decode_length_delimited(bytes.as_slice()).unwrap();

        assert_eq!(decoded, stored);
        assert_eq!(store.lookup(&stored.fingerprint).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = Directory::open(dir.path()).await.unwrap();

        let first = store.insert(grant("bob")).await.unwrap();
        let path = dir.path().join(&first.fingerprint);
        let before = std::fs::read(&path).unwrap();

        let second = store.insert(grant("bob")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
        assert_eq!(store.lookup(&first.fingerprint).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_grant() {
        let dir = TempDir::new().unwrap();
        let store = Directory::open(dir.path()).await.unwrap();
        let stored = store.insert(grant("carol")).await.unwrap();

        let removed = store
            .delete(Grant {
                fingerprint: stored.fingerprint.clone(),
                ..Grant::default()
            })
            .await
            .unwrap();
        assert_eq!(removed, stored);
        assert!(
            store
                .lookup(&stored.fingerprint)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.delete(stored).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_non_canonical_fingerprints() {
        let dir = TempDir::new().unwrap();
        let store = Directory::open(dir.path()).await.unwrap();

        let upper = "A".repeat(64);
        for bad in ["../etc/passwd", "ABCDEF", "", upper.as_str()] {
            let err = store.lookup(bad).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_sync_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = Directory::open(dir.path()).await.unwrap();
        store.insert(grant("one")).await.unwrap();
        store.insert(grant("two")).await.unwrap();
        std::fs::write(dir.path().join("README"), b"not a grant").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        store.sync(tx, CancellationToken::new()).await.unwrap();

        let mut seen = Vec::new();
        while let Some(grant) = rx.recv().await {
            seen.push(grant.fingerprint);
        }
        seen.sort();
        let mut expected = vec![grant("one").fingerprint, grant("two").fingerprint];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_missing_root_enumerates_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Directory::new(dir.path().join("absent"));
        let (tx, mut rx) = mpsc::channel(1);
        store.sync(tx, CancellationToken::new()).await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
