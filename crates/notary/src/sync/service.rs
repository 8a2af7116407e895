//! Responder side of `notary.Sync`.

use std::sync::Arc;

use notary_proto::{Chunk, Permission, SyncRequest, SyncStream, sync_stream};
use notary_storage::{Storage, SyncStorage};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::debug;

use super::bloom::BloomFilter;
use super::stream::stream_grants;
use crate::auth::Auth;
use crate::rpc::sync_server::{Sync as SyncRpc, SyncServer};

/// Serves `Sync/Stream`: every grant the requester's filter does not
/// already contain, in chunks.
#[derive(Clone)]
pub struct SyncService {
    storage: Arc<dyn SyncStorage>,
    auth: Auth,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService").finish_non_exhaustive()
    }
}

impl SyncService {
    /// Serve grants from `storage`, authorizing callers against it too.
    #[must_use]
    pub fn new<T: SyncStorage + 'static>(storage: Arc<T>) -> Self {
        let lookup: Arc<dyn Storage> = storage.clone();
        Self {
            storage,
            auth: Auth::new(lookup),
        }
    }

    /// Wrap in the generated tonic server.
    #[must_use]
    pub fn into_server(self) -> SyncServer<Self> {
        SyncServer::new(self)
    }
}

#[tonic::async_trait]
impl SyncRpc for SyncService {
    type StreamStream = ReceiverStream<Result<SyncStream, Status>>;

    async fn stream(
        &self,
        request: Request<SyncRequest>,
    ) -> Result<Response<Self::StreamStream>, Status> {
        self.auth
            .require(request.metadata(), Permission::SYNC)
            .await?;

        let filter = BloomFilter::from_bytes(&request.get_ref().bloom)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        debug!(
            bits = filter.bit_count(),
            hashes = filter.hashes(),
            "serving sync stream"
        );

        Ok(Response::new(stream_grants(
            Arc::clone(&self.storage),
            move |grant| filter.contains(grant.fingerprint.as_bytes()),
            |grants| SyncStream {
                payload: Some(sync_stream::Payload::Chunk(Chunk { grants })),
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use notary_crypto::KeyPair;
    use notary_proto::Grant;
    use notary_storage::Memory;
    use tokio_stream::StreamExt;
    use tonic::Code;
    use tonic::metadata::AsciiMetadataValue;

    use super::*;
    use crate::auth::AUTHORIZATION_KEY;
    use crate::signer::Signer;

    fn signed(signer: &Signer, bloom: Vec<u8>) -> Request<SyncRequest> {
        let mut request = Request::new(SyncRequest { bloom });
        let value: AsciiMetadataValue = signer.token().parse().unwrap();
        request.metadata_mut().insert(AUTHORIZATION_KEY, value);
        request
    }

    async fn setup(permission: Permission, extra: usize) -> (Arc<Memory>, Signer, Vec<Grant>) {
        let storage = Arc::new(Memory::new());
        let signer = Signer::new(KeyPair::generate());
        storage
            .insert(Grant::for_key(&signer.public_key(), permission))
            .await
            .unwrap();
        let mut grants = Vec::new();
        for _ in 0..extra {
            let key = KeyPair::generate().export_public_key();
            let stored = storage
                .insert(Grant::for_key(&key, Permission::none()))
                .await
                .unwrap();
            grants.push(stored);
        }
        (storage, signer, grants)
    }

    fn received(chunks: Vec<SyncStream>) -> Vec<Grant> {
        chunks
            .into_iter()
            .filter_map(|message| match message.payload {
                Some(sync_stream::Payload::Chunk(chunk)) => Some(chunk.grants),
                None => None,
            })
            .flatten()
            .collect()
    }

    #[tokio::test]
    async fn test_skips_grants_in_filter() {
        let (storage, peer, grants) = setup(Permission::SYNC, 20).await;
        let mut filter = BloomFilter::with_rate(100, 0.001);
        for grant in &grants[..10] {
            filter.insert(grant.fingerprint.as_bytes());
        }

        let chunks: Vec<SyncStream> = SyncService::new(storage)
            .stream(signed(&peer, filter.to_bytes()))
            .await
            .unwrap()
            .into_inner()
            .map(Result::unwrap)
            .collect()
            .await;
        let got = received(chunks);

        for grant in &grants[10..] {
            assert!(got.contains(grant));
        }
        for grant in &grants[..10] {
            assert!(!got.contains(grant));
        }
    }

    #[tokio::test]
    async fn test_empty_filter_sends_everything() {
        let (storage, peer, _) = setup(Permission::SYNC, 5).await;
        let chunks: Vec<SyncStream> = SyncService::new(storage)
            .stream(signed(&peer, Vec::new()))
            .await
            .unwrap()
            .into_inner()
            .map(Result::unwrap)
            .collect()
            .await;
        // The caller's own grant is included.
        assert_eq!(received(chunks).len(), 6);
    }

    #[tokio::test]
    async fn test_requires_sync_bit() {
        let (storage, peer, _) = setup(Permission::SEARCH, 0).await;
        let err = SyncService::new(storage)
            .stream(signed(&peer, Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);
    }

    #[tokio::test]
    async fn test_rejects_malformed_filter() {
        let (storage, peer, _) = setup(Permission::SYNC, 0).await;
        let err = SyncService::new(storage)
            .stream(signed(&peer, vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }
}
