//! Authorized-keys file bucket.
//!
//! Every key listed in the file is granted the bucket's configured
//! [`Permission`]. The file is parsed into a [`Memory`] snapshot which is
//! swapped in whole whenever the file changes, so readers never block and
//! never observe a half-parsed file.
//!
//! # Architecture
//!
//! ```text
//! filesystem events (notify, parent directory)
//!   → filter to the watched file name
//!   → re-parse the whole file
//!   → ArcSwap::store(new snapshot)
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use notary_crypto::AuthorizedKey;
use notary_proto::{Grant, Permission};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::memory::Memory;
use crate::storage::{self, Storage, SyncStorage};

/// A watched authorized-keys file.
///
/// Dropping the `File` drops the filesystem watcher, which closes the event
/// channel and ends the reload task.
pub struct File {
    inner: Arc<Inner>,
    /// Serialises administrative rewrites of the file.
    write_lock: Mutex<()>,
    /// Kept alive for the lifetime of the bucket; `None` when the parent
    /// directory could not be watched.
    _watcher: Option<RecommendedWatcher>,
}

struct Inner {
    path: PathBuf,
    permission: Permission,
    snapshot: ArcSwap<Memory>,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.inner.path)
            .field("permission", &self.inner.permission)
            .field("grants", &self.inner.snapshot.load().len())
            .finish_non_exhaustive()
    }
}

impl File {
    /// Load `path` and start watching it.
    ///
    /// A missing file is an empty bucket; creating it later is picked up by
    /// the watcher. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>, permission: Permission) -> StorageResult<Self> {
        let path = path.into();
        let snapshot = load(&path, permission).await?;
        info!(
            path = %path.display(),
            permission = %permission,
            grants = snapshot.len(),
            "Loaded authorized keys"
        );

        let inner = Arc::new(Inner {
            path,
            permission,
            snapshot: ArcSwap::from_pointee(snapshot),
        });
        let watcher = spawn_watcher(&inner);

        Ok(Self {
            inner,
            write_lock: Mutex::new(()),
            _watcher: watcher,
        })
    }

    /// The watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The permission every key in this file receives.
    #[must_use]
    pub fn permission(&self) -> Permission {
        self.inner.permission
    }

    /// Re-parse the file now and swap in the result.
    ///
    /// Returns the number of grants loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read. The previous
    /// snapshot stays in place.
    pub async fn reload(&self) -> StorageResult<usize> {
        self.inner.reload().await
    }

    /// Replace the file contents with `lines` and reload.
    async fn rewrite(&self, lines: Vec<String>) -> StorageResult<()> {
        let path = self.inner.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &lines))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))??;
        self.reload().await?;
        Ok(())
    }

    /// Current lines of the file with any entry for `fingerprint` removed.
    async fn lines_without(&self, fingerprint: &str) -> StorageResult<Vec<String>> {
        let text = read_optional(&self.inner.path).await?;
        Ok(text
            .lines()
            .filter(|line| match AuthorizedKey::parse_line(line) {
                Ok(Some(entry)) => entry.key.fingerprint().to_hex() != fingerprint,
                _ => true,
            })
            .map(str::to_owned)
            .collect())
    }
}

impl Inner {
    async fn reload(&self) -> StorageResult<usize> {
        let snapshot = load(&self.path, self.permission).await?;
        let count = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));
        debug!(path = %self.path.display(), grants = count, "Reloaded authorized keys");
        Ok(count)
    }

    fn is_ours(&self, event: &Event) -> bool {
        let Some(name) = self.path.file_name() else {
            return false;
        };
        event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(name))
    }
}

#[async_trait]
impl Storage for File {
    async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
        let snapshot = self.inner.snapshot.load_full();
        snapshot.lookup(fingerprint).await
    }

    /// Append the grant's key to the file. The stored permission is always
    /// the bucket's, whatever the grant carried.
    async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
        let key = grant
            .public_key()
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        let stored = Grant::for_key(&key, self.inner.permission);

        let _guard = self.write_lock.lock().await;
        let mut lines = self.lines_without(&stored.fingerprint).await?;
        lines.push(key.to_authorized_key().trim_end().to_owned());
        self.rewrite(lines).await?;

        Ok(stored)
    }

    async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
        let fingerprint = grant.storage_key();

        let _guard = self.write_lock.lock().await;
        let existing = self.lookup(&fingerprint).await?;
        let lines = self.lines_without(&fingerprint).await?;
        self.rewrite(lines).await?;

        Ok(existing)
    }
}

#[async_trait]
impl SyncStorage for File {
    async fn sync(&self, tx: mpsc::Sender<Grant>, cancel: CancellationToken) -> StorageResult<()> {
        let grants = self.inner.snapshot.load_full().snapshot()?;
        storage::send_all(grants, &tx, &cancel).await
    }
}

/// Parse the file into a snapshot. A missing file is empty.
async fn load(path: &Path, permission: Permission) -> StorageResult<Memory> {
    let text = read_optional(path).await?;

    let mut grants = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match AuthorizedKey::parse_line(line) {
            Ok(Some(entry)) => grants.push(Grant::for_key(&entry.key, permission)),
            Ok(None) => {},
            Err(e) => warn!(
                path = %path.display(),
                line = index.saturating_add(1),
                error = %e,
                "Skipping malformed authorized key"
            ),
        }
    }
    Ok(Memory::from_grants(grants))
}

async fn read_optional(path: &Path) -> StorageResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write through a temporary file in the same directory, then rename over
/// the target.
fn write_atomically(path: &Path, lines: &[String]) -> StorageResult<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    for line in lines {
        writeln!(tmp, "{line}")?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// Watch the file's parent directory and reload on every event that names
/// the file. Returns `None` if the watcher cannot be started.
fn spawn_watcher(inner: &Arc<Inner>) -> Option<RecommendedWatcher> {
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = raw_tx.send(res);
        },
        notify::Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!(error = %e, "Failed to create filesystem watcher");
            return None;
        },
    };

    let dir = parent_dir(&inner.path);
    if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
        warn!(
            path = %dir.display(),
            error = %e,
            "Failed to watch authorized keys directory, changes will need a reload"
        );
        return None;
    }

    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        while let Some(event) = raw_rx.recv().await {
            match event {
                Ok(event) if event.kind.is_access() || !inner.is_ours(&event) => {},
                Ok(_) => {
                    if let Err(e) = inner.reload().await {
                        warn!(path = %inner.path.display(), error = %e, "Reload failed");
                    }
                },
                Err(e) => warn!(error = %e, "Filesystem watcher error"),
            }
        }
        debug!(path = %inner.path.display(), "Authorized keys watcher stopped");
    });

    Some(watcher)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use notary_crypto::KeyPair;
    use tempfile::TempDir;

    use super::*;

    fn key_line(seed: &str, comment: &str) -> String {
        let key = KeyPair::from_seed(seed.as_bytes()).export_public_key();
        format!("{} {comment}\n", key.to_authorized_key().trim_end())
    }

    fn fingerprint(seed: &str) -> String {
        KeyPair::from_seed(seed.as_bytes()).fingerprint().to_hex()
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_keys_receive_bucket_permission() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authorized_keys");
        let text = format!(
            "# admins\n\n{}garbage line\n{}",
            key_line("alice", "alice@laptop"),
            key_line("bob", "bob@desk")
        );
        std::fs::write(&path, text).unwrap();

        let bucket = File::open(&path, Permission::all()).await.unwrap();
        let alice = bucket.lookup(&fingerprint("alice")).await.unwrap();
        assert_eq!(alice.permission, Some(Permission::all()));
        assert!(bucket.lookup(&fingerprint("bob")).await.is_ok());
        assert!(
            bucket
                .lookup(&fingerprint("carol"))
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let bucket = File::open(dir.path().join("absent"), Permission::SYNC)
            .await
            .unwrap();
        assert!(bucket.lookup(&fingerprint("alice")).await.is_err());
        assert_eq!(bucket.reload().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authorized_keys");
        std::fs::write(&path, key_line("alice", "a")).unwrap();
        let bucket = File::open(&path, Permission::GRANT).await.unwrap();

        std::fs::write(&path, key_line("bob", "b")).unwrap();
        assert_eq!(bucket.reload().await.unwrap(), 1);

        assert!(bucket.lookup(&fingerprint("alice")).await.is_err());
        assert!(bucket.lookup(&fingerprint("bob")).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_watcher_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authorized_keys");
        let bucket = File::open(&path, Permission::GRANT).await.unwrap();

        std::fs::write(&path, key_line("carol", "c")).unwrap();

        let bucket = &bucket;
        eventually(move || async move { bucket.lookup(&fingerprint("carol")).await.is_ok() }).await;
    }

    #[tokio::test]
    async fn test_insert_and_delete_rewrite_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authorized_keys");
        std::fs::write(&path, format!("# keep me\n{}", key_line("alice", "a"))).unwrap();
        let bucket = File::open(&path, Permission::DEPLOY).await.unwrap();

        let key = KeyPair::from_seed(b"dave").export_public_key();
        let stored = bucket
            .insert(Grant::for_key(&key, Permission::all()))
            .await
            .unwrap();
        assert_eq!(stored.permission, Some(Permission::DEPLOY));
        assert!(bucket.lookup(&stored.fingerprint).await.is_ok());

        let removed = bucket
            .delete(Grant {
                fingerprint: fingerprint("alice"),
                ..Grant::default()
            })
            .await
            .unwrap();
        assert_eq!(removed.fingerprint, fingerprint("alice"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# keep me\n"));
        assert_eq!(text.lines().count(), 2);
        assert!(bucket.lookup(&fingerprint("alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_rejects_unparsable_key() {
        let dir = TempDir::new().unwrap();
        let bucket = File::open(dir.path().join("keys"), Permission::none())
            .await
            .unwrap();
        let err = bucket
            .insert(Grant {
                authorization: b"ssh-rsa AAAA".to_vec(),
                ..Grant::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
