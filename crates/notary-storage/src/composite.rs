//! A mutable primary store in front of read-only buckets.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use notary_proto::Grant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, StorageResult};
use crate::storage::{self, Storage, SyncStorage};

/// Capacity of the per-member channel used while enumerating.
const MEMBER_BUFFER: usize = 64;

struct Member {
    storage: Arc<dyn Storage>,
    sync: Option<Arc<dyn SyncStorage>>,
}

impl Member {
    fn plain(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            sync: None,
        }
    }

    fn enumerable<T: SyncStorage + 'static>(storage: Arc<T>) -> Self {
        let sync: Arc<dyn SyncStorage> = storage.clone();
        Self {
            storage,
            sync: Some(sync),
        }
    }
}

/// Reads fall through primary then buckets in order; writes go to the
/// primary only.
///
/// A composite built entirely from enumerable members (see
/// [`Composite::enumerable`]) also enumerates: primary first, then each
/// bucket, never emitting a fingerprint twice.
pub struct Composite {
    primary: Member,
    buckets: Vec<Member>,
}

impl std::fmt::Debug for Composite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composite")
            .field("buckets", &self.buckets.len())
            .field("enumerable", &self.is_enumerable())
            .finish_non_exhaustive()
    }
}

impl Composite {
    /// A composite over `primary` with no buckets.
    #[must_use]
    pub fn new(primary: Arc<dyn Storage>) -> Self {
        Self {
            primary: Member::plain(primary),
            buckets: Vec::new(),
        }
    }

    /// A composite over an enumerable `primary`.
    #[must_use]
    pub fn enumerable<T: SyncStorage + 'static>(primary: Arc<T>) -> Self {
        Self {
            primary: Member::enumerable(primary),
            buckets: Vec::new(),
        }
    }

    /// Append a read-only bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: Arc<dyn Storage>) -> Self {
        self.buckets.push(Member::plain(bucket));
        self
    }

    /// Append an enumerable read-only bucket.
    #[must_use]
    pub fn with_enumerable_bucket<T: SyncStorage + 'static>(mut self, bucket: Arc<T>) -> Self {
        self.buckets.push(Member::enumerable(bucket));
        self
    }

    /// Whether every member can enumerate, making [`SyncStorage::sync`]
    /// usable.
    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        self.members().all(|member| member.sync.is_some())
    }

    fn members(&self) -> impl Iterator<Item = &Member> {
        std::iter::once(&self.primary).chain(&self.buckets)
    }
}

#[async_trait]
impl Storage for Composite {
    async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant> {
        let mut last = StorageError::NotFound(fingerprint.to_owned());
        for member in self.members() {
            match member.storage.lookup(fingerprint).await {
                Ok(grant) => return Ok(grant),
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    async fn insert(&self, grant: Grant) -> StorageResult<Grant> {
        self.primary.storage.insert(grant).await
    }

    async fn delete(&self, grant: Grant) -> StorageResult<Grant> {
        self.primary.storage.delete(grant).await
    }
}

#[async_trait]
impl SyncStorage for Composite {
    async fn sync(&self, tx: mpsc::Sender<Grant>, cancel: CancellationToken) -> StorageResult<()> {
        let members = self
            .members()
            .map(|member| {
                member.sync.clone().ok_or_else(|| {
                    StorageError::Internal("composite member cannot enumerate".into())
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let mut emitted = HashSet::new();
        for member in members {
            let (member_tx, mut member_rx) = mpsc::channel::<Grant>(MEMBER_BUFFER);
            let (emitted, tx, cancel_ref) = (&mut emitted, &tx, &cancel);
            // Owns the receiver so the member's sends fail once forwarding stops.
            let forward = async move {
                while let Some(grant) = member_rx.recv().await {
                    if emitted.insert(grant.fingerprint.clone()) {
                        storage::send_one(grant, tx, cancel_ref).await?;
                    }
                }
                Ok::<(), StorageError>(())
            };
            let (enumerated, forwarded) =
                tokio::join!(member.sync(member_tx, cancel.clone()), forward);
            // A closed downstream surfaces in both; report it once.
            forwarded?;
            enumerated?;
        }
        Ok(())
    }
}
