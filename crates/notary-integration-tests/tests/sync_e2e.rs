//! End-to-end tests of grant replication over `notary.Sync`.

use std::sync::Arc;

use notary::{BloomFilter, Replicator};
use notary_proto::{Grant, Permission, SyncRequest, sync_stream};
use notary_storage::{Composite, Directory, File, Memory, Storage};
use notary_test::{TestServer, grant_for, init_test_logging, test_grants, test_signer};
use tonic::Code;

#[tokio::test]
async fn test_empty_node_pulls_everything() {
    init_test_logging();
    let puller = test_signer();
    let grants = test_grants(2);

    let node_a = Arc::new(Memory::from_grants(grants.clone()));
    node_a
        .insert(grant_for(&puller, Permission::SYNC))
        .await
        .unwrap();
    let server = TestServer::authority(Arc::clone(&node_a)).await.unwrap();

    let node_b = Arc::new(Memory::new());
    let replicator = Replicator::new(Arc::clone(&node_b), puller);
    let received = replicator.pull_from(&server.uri()).await.unwrap();

    // g1, g2 and the puller's own grant.
    assert_eq!(received, 3);
    for grant in &grants {
        assert_eq!(&node_b.lookup(&grant.fingerprint).await.unwrap(), grant);
    }
}

#[tokio::test]
async fn test_pull_sends_only_missing_grants() {
    init_test_logging();
    let puller = test_signer();
    let shared = test_grants(150);
    let only_a = test_grants(150);

    let node_a = Arc::new(Memory::from_grants(shared.iter().chain(&only_a).cloned()));
    node_a
        .insert(grant_for(&puller, Permission::SYNC))
        .await
        .unwrap();
    let server = TestServer::authority(Arc::clone(&node_a)).await.unwrap();

    let node_b = Arc::new(Memory::from_grants(shared.clone()));
    let replicator = Replicator::with_capacity(Arc::clone(&node_b), puller, 10_000, 0.001);
    assert_eq!(replicator.prime().await.unwrap(), 150);

    let received = replicator.pull_from(&server.uri()).await.unwrap();
    assert_eq!(received, 151);
    for grant in shared.iter().chain(&only_a) {
        assert!(node_b.lookup(&grant.fingerprint).await.is_ok());
    }

    // A second pull finds nothing new.
    assert_eq!(replicator.pull_from(&server.uri()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sync_requires_sync_bit() {
    init_test_logging();
    let caller = test_signer();
    let node = Arc::new(Memory::new());
    node.insert(grant_for(&caller, Permission::SEARCH))
        .await
        .unwrap();
    let server = TestServer::authority(node).await.unwrap();

    let replicator = Replicator::new(Arc::new(Memory::new()), caller);
    let err = replicator.pull_from(&server.uri()).await.unwrap_err();
    assert!(matches!(
        err,
        notary::NotaryError::Status(status) if status.code() == Code::PermissionDenied
    ));
}

#[tokio::test]
async fn test_stream_batches_large_stores() {
    init_test_logging();
    let caller = test_signer();
    let node = Arc::new(Memory::from_grants(test_grants(250)));
    node.insert(grant_for(&caller, Permission::SYNC))
        .await
        .unwrap();
    let server = TestServer::authority(node).await.unwrap();

    let mut stream = server
        .sync_client(&caller)
        .await
        .unwrap()
        .stream(SyncRequest {
            bloom: BloomFilter::with_rate(10, 0.01).to_bytes(),
        })
        .await
        .unwrap()
        .into_inner();

    let mut sizes = Vec::new();
    while let Some(message) = stream.message().await.unwrap() {
        let Some(sync_stream::Payload::Chunk(chunk)) = message.payload else {
            panic!("unexpected empty payload");
        };
        sizes.push(chunk.grants.len());
    }
    assert!(sizes.iter().all(|size| *size <= 100));
    assert_eq!(sizes.iter().sum::<usize>(), 251);
}

#[tokio::test]
async fn test_composite_node_serves_buckets() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let puller = test_signer();
    let bucket_key = test_signer();

    let keys = dir.path().join("authorized_keys");
    let line = puller.public_key().to_authorized_key();
    std::fs::write(&keys, format!("# peers\n{line}")).unwrap();
    let bucket = File::open(&keys, Permission::SYNC).await.unwrap();

    let primary = Directory::open(dir.path().join("grants")).await.unwrap();
    let stored: Grant = primary
        .insert(grant_for(&bucket_key, Permission::none()))
        .await
        .unwrap();

    let node_a = Arc::new(
        Composite::enumerable(Arc::new(primary)).with_enumerable_bucket(Arc::new(bucket)),
    );
    let server = TestServer::authority(node_a).await.unwrap();

    let node_b = Arc::new(Memory::new());
    let replicator = Replicator::new(Arc::clone(&node_b), puller.clone());
    assert_eq!(replicator.pull_from(&server.uri()).await.unwrap(), 2);

    assert_eq!(node_b.lookup(&stored.fingerprint).await.unwrap(), stored);
    let pulled = node_b.lookup(&puller.fingerprint().to_hex()).await.unwrap();
    assert_eq!(pulled.permission_or_none(), Permission::SYNC);
}
