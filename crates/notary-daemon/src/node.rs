//! Assembling and running a notary node from configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notary::{Proxy, Replicator, Service, Signer, SyncService};
use notary_config::{Config, ServerMode, StorageSection, SyncSection};
use notary_proto::Permission;
use notary_storage::{Composite, Directory, File, Memory};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::transport::server::Router;
use tracing::{info, warn};

/// Build the node's store: a directory (or memory) primary followed by
/// the configured authorized-keys buckets.
pub(crate) async fn open_storage(section: &StorageSection) -> Result<Composite> {
    let mut storage = if let Some(dir) = &section.directory {
        let directory = Directory::open(dir)
            .await
            .with_context(|| format!("failed to open grant directory {dir}"))?;
        Composite::enumerable(Arc::new(directory))
    } else {
        warn!("no storage directory configured, grants will not survive a restart");
        Composite::enumerable(Arc::new(Memory::new()))
    };

    for bucket in &section.buckets {
        let permission = Permission::from_names(bucket.permission.names())
            .with_context(|| format!("invalid permission for bucket {}", bucket.path))?;
        let file = File::open(&bucket.path, permission)
            .await
            .with_context(|| format!("failed to open bucket {}", bucket.path))?;
        info!(path = %bucket.path, %permission, "loaded authorized keys bucket");
        storage = storage.with_enumerable_bucket(Arc::new(file));
    }
    Ok(storage)
}

/// A running node.
pub(crate) struct Node {
    addr: SocketAddr,
    mode: ServerMode,
    shutdown: CancellationToken,
    server: JoinHandle<Result<(), tonic::transport::Error>>,
    replication: Option<JoinHandle<()>>,
}

impl Node {
    /// Bind, then serve in the configured mode until [`Node::stop`].
    pub(crate) async fn start(config: &Config) -> Result<Self> {
        let signer = Signer::load(&config.keys).context("failed to load signing key")?;
        info!(fingerprint = %signer.fingerprint(), "node identity");

        let shutdown = CancellationToken::new();
        let (router, replication) = match config.server.mode {
            ServerMode::Authority => {
                let storage = Arc::new(open_storage(&config.storage).await?);
                let replication =
                    spawn_replication(&config.sync, Arc::clone(&storage), signer, &shutdown).await?;
                let router = Server::builder()
                    .add_service(Service::with_sync(Arc::clone(&storage)).into_server())
                    .add_service(SyncService::new(storage).into_server());
                (router, replication)
            },
            ServerMode::Proxy => {
                let upstream = config
                    .server
                    .upstream
                    .as_deref()
                    .context("proxy mode requires server.upstream")?;
                info!(%upstream, "proxying to upstream");
                let router = Server::builder().add_service(Proxy::new(upstream)?.into_server());
                (router, None)
            },
        };

        let listener = TcpListener::bind(&config.server.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen))?;
        let addr = listener.local_addr()?;
        let server = serve(router, listener, shutdown.clone());

        Ok(Self {
            addr,
            mode: config.server.mode,
            shutdown,
            server,
            replication,
        })
    }

    /// Bound address.
    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serving mode.
    pub(crate) fn mode(&self) -> ServerMode {
        self.mode
    }

    /// Stop serving and replicating.
    pub(crate) async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(replication) = self.replication {
            replication.await.context("replication task panicked")?;
        }
        self.server.await.context("server task panicked")??;
        info!("node stopped");
        Ok(())
    }
}

fn serve(
    router: Router,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), tonic::transport::Error>> {
    tokio::spawn(async move {
        router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                shutdown.cancelled().await;
            })
            .await
    })
}

async fn spawn_replication(
    section: &SyncSection,
    storage: Arc<Composite>,
    signer: Signer,
    shutdown: &CancellationToken,
) -> Result<Option<JoinHandle<()>>> {
    if section.peers.is_empty() {
        return Ok(None);
    }

    let replicator = Replicator::with_capacity(
        storage,
        signer,
        section.expected_grants,
        section.false_positive_rate,
    );
    let primed = replicator
        .prime()
        .await
        .context("failed to prime sync filter")?;
    info!(peers = section.peers.len(), primed, "starting replication");

    let peers = section.peers.clone();
    let interval = Duration::from_secs(section.interval_secs);
    let cancel = shutdown.clone();
    Ok(Some(tokio::spawn(async move {
        replicator.run(&peers, interval, cancel).await;
    })))
}

#[cfg(test)]
mod tests {
    use notary_config::BucketConfig;
    use notary_config::PermissionSpec;
    use notary_crypto::KeyPair;
    use notary_storage::{Storage, SyncStorage};

    use super::*;

    #[tokio::test]
    async fn test_open_storage_with_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let admin = KeyPair::generate().export_public_key();
        let keys = dir.path().join("authorized_keys");
        std::fs::write(&keys, admin.to_authorized_key()).unwrap();

        let section = StorageSection {
            directory: Some(dir.path().join("grants").display().to_string()),
            buckets: vec![BucketConfig {
                path: keys.display().to_string(),
                permission: PermissionSpec::List(vec!["grant".into(), "revoke".into()]),
            }],
        };
        let storage = open_storage(&section).await.unwrap();
        assert!(storage.is_enumerable());

        let grant = storage.lookup(&admin.fingerprint().to_hex()).await.unwrap();
        let permission = grant.permission_or_none();
        assert!(permission.grant && permission.revoke && !permission.sync);

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        storage.sync(tx, CancellationToken::new()).await.unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_open_storage_rejects_unknown_permission() {
        let section = StorageSection {
            directory: None,
            buckets: vec![BucketConfig {
                path: "/nonexistent/authorized_keys".into(),
                permission: PermissionSpec::Single("fly".into()),
            }],
        };
        assert!(open_storage(&section).await.is_err());
    }

    #[tokio::test]
    async fn test_start_and_stop_authority() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.keys.private_key = dir.path().join("id_ed25519").display().to_string();
        config.server.listen = "127.0.0.1:0".into();

        let node = Node::start(&config).await.unwrap();
        assert_eq!(node.mode(), ServerMode::Authority);
        assert_ne!(node.addr().port(), 0);
        node.stop().await.unwrap();
    }
}
