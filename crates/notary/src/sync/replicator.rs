//! Requester side of `notary.Sync`.

use std::sync::Arc;
use std::time::Duration;

use notary_proto::{Grant, SyncRequest, sync_stream};
use notary_storage::{Storage, SyncStorage};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

use super::bloom::BloomFilter;
use super::stream::ENUMERATION_BUFFER;
use crate::client::connect;
use crate::error::NotaryResult;
use crate::signer::Signer;

/// Default expected grant count for the accumulator filter.
pub const DEFAULT_EXPECTED_GRANTS: usize = 10_000;

/// Default false-positive rate for the accumulator filter.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Pulls grants from peers into local storage.
///
/// Keeps a Bloom filter of every fingerprint it holds so peers only send
/// what is missing.
pub struct Replicator {
    storage: Arc<dyn Storage>,
    source: Arc<dyn SyncStorage>,
    signer: Signer,
    filter: Mutex<BloomFilter>,
}

impl std::fmt::Debug for Replicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replicator")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl Replicator {
    /// Replicate into `storage`, signing requests with `signer`.
    #[must_use]
    pub fn new<T: SyncStorage + 'static>(storage: Arc<T>, signer: Signer) -> Self {
        Self::with_capacity(
            storage,
            signer,
            DEFAULT_EXPECTED_GRANTS,
            DEFAULT_FALSE_POSITIVE_RATE,
        )
    }

    /// Like [`Replicator::new`] with an explicitly sized filter.
    #[must_use]
    pub fn with_capacity<T: SyncStorage + 'static>(
        storage: Arc<T>,
        signer: Signer,
        expected_grants: usize,
        false_positive_rate: f64,
    ) -> Self {
        let source: Arc<dyn SyncStorage> = storage.clone();
        Self {
            storage,
            source,
            signer,
            filter: Mutex::new(BloomFilter::with_rate(expected_grants, false_positive_rate)),
        }
    }

    /// Add every locally stored fingerprint to the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if enumerating local storage fails.
    pub async fn prime(&self) -> NotaryResult<usize> {
        let (tx, mut rx) = mpsc::channel(ENUMERATION_BUFFER);
        let cancel = CancellationToken::new();
        let source = Arc::clone(&self.source);
        let enumeration = tokio::spawn(async move { source.sync(tx, cancel).await });

        let mut count = 0usize;
        while let Some(grant) = rx.recv().await {
            self.remember(&grant).await;
            count = count.saturating_add(1);
        }
        enumeration
            .await
            .map_err(|e| notary_storage::StorageError::Internal(e.to_string()))??;

        debug!(count, "primed sync filter from local storage");
        Ok(count)
    }

    /// Pull every grant `channel`'s peer holds that the filter lacks.
    ///
    /// Returns the number of grants received.
    ///
    /// # Errors
    ///
    /// Returns the peer's status, a transport error, or a local storage
    /// error. Grants received before the error are kept.
    pub async fn pull(&self, channel: Channel) -> NotaryResult<usize> {
        let bloom = self.filter.lock().await.to_bytes();
        let mut stream = self
            .signer
            .sync_client(channel)
            .stream(SyncRequest { bloom })
            .await?
            .into_inner();

        let mut received = 0usize;
        while let Some(message) = stream.message().await? {
            let Some(sync_stream::Payload::Chunk(chunk)) = message.payload else {
                continue;
            };
            for grant in chunk.grants {
                let stored = self.storage.insert(grant).await?;
                self.remember(&stored).await;
                received = received.saturating_add(1);
            }
        }
        Ok(received)
    }

    /// Dial `uri` and [`pull`](Replicator::pull) from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer cannot be reached or the pull fails.
    pub async fn pull_from(&self, uri: &str) -> NotaryResult<usize> {
        let channel = connect(uri).await?;
        self.pull(channel).await
    }

    /// Pull from `peers` every `interval` until `cancel` fires.
    pub async fn run(&self, peers: &[String], interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {},
            }
            for peer in peers {
                match self.pull_from(peer).await {
                    Ok(0) => debug!(peer = %peer, "peer had nothing new"),
                    Ok(received) => info!(peer = %peer, received, "pulled grants"),
                    Err(e) => warn!(peer = %peer, error = %e, "sync pull failed"),
                }
            }
        }
    }

    async fn remember(&self, grant: &Grant) {
        self.filter
            .lock()
            .await
            .insert(grant.storage_key().as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use notary_crypto::KeyPair;
    use notary_proto::Permission;
    use notary_storage::Memory;

    use super::*;

    #[tokio::test]
    async fn test_prime_fills_filter() {
        let grants: Vec<Grant> = (0..25)
            .map(|_| Grant::for_key(&KeyPair::generate().export_public_key(), Permission::none()))
            .collect();
        let storage = Arc::new(Memory::from_grants(grants.clone()));
        let replicator = Replicator::with_capacity(
            storage,
            Signer::new(KeyPair::generate()),
            100,
            0.001,
        );

        assert_eq!(replicator.prime().await.unwrap(), 25);
        let filter = replicator.filter.lock().await;
        assert!(
            grants
                .iter()
                .all(|grant| filter.contains(grant.fingerprint.as_bytes()))
        );
    }

    #[tokio::test]
    async fn test_pull_from_invalid_uri() {
        let replicator = Replicator::new(Arc::new(Memory::new()), Signer::new(KeyPair::generate()));
        assert!(matches!(
            replicator.pull_from("not a uri").await,
            Err(crate::NotaryError::InvalidUri(_))
        ));
    }
}
