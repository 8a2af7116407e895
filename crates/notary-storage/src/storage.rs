//! The storage traits.

use async_trait::async_trait;
use notary_proto::Grant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, StorageResult};

/// A grant store keyed by fingerprint.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the grant stored under `fingerprint`.
    ///
    /// Fails with [`StorageError::NotFound`] when there is none.
    async fn lookup(&self, fingerprint: &str) -> StorageResult<Grant>;

    /// Normalise and store `grant`, replacing any grant with the same
    /// fingerprint. Returns the grant as stored.
    async fn insert(&self, grant: Grant) -> StorageResult<Grant>;

    /// Remove the grant with `grant`'s fingerprint and return it.
    ///
    /// The fingerprint is derived from the authorization when the grant
    /// carries none.
    async fn delete(&self, grant: Grant) -> StorageResult<Grant>;
}

/// A store that can enumerate its contents.
#[async_trait]
pub trait SyncStorage: Storage {
    /// Send every stored grant into `tx`.
    ///
    /// Returns [`StorageError::Cancelled`] once `cancel` fires or the
    /// receiving end closes. Both are checked between items.
    async fn sync(&self, tx: mpsc::Sender<Grant>, cancel: CancellationToken) -> StorageResult<()>;
}

/// Feed `grants` into `tx`, stopping on cancellation.
pub(crate) async fn send_all<I>(
    grants: I,
    tx: &mpsc::Sender<Grant>,
    cancel: &CancellationToken,
) -> StorageResult<()>
where
    I: IntoIterator<Item = Grant> + Send,
    I::IntoIter: Send,
{
    for grant in grants {
        send_one(grant, tx, cancel).await?;
    }
    Ok(())
}

/// Send a single grant unless enumeration was cancelled.
pub(crate) async fn send_one(
    grant: Grant,
    tx: &mpsc::Sender<Grant>,
    cancel: &CancellationToken,
) -> StorageResult<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StorageError::Cancelled),
        sent = tx.send(grant) => sent.map_err(|_| StorageError::Cancelled),
    }
}
