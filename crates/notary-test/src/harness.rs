//! In-process notary servers on ephemeral ports.

use std::net::SocketAddr;
use std::sync::Arc;

use notary::{
    NotaryResult, Proxy, Service, SignedNotaryClient, SignedSyncClient, Signer, SyncService,
};
use notary_storage::SyncStorage;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::server::Router;
use tonic::transport::{Channel, Server};
use tracing::debug;

/// Install a test-friendly subscriber once. Later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A server running on `127.0.0.1` until dropped.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn spawn(router: Router) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    signal.cancelled().await;
                })
                .await
        });
        debug!(%addr, "test server listening");
        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    /// An authority serving `Notary` and `Sync` from `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn authority<T: SyncStorage + 'static>(storage: Arc<T>) -> std::io::Result<Self> {
        let router = Server::builder()
            .add_service(Service::with_sync(Arc::clone(&storage)).into_server())
            .add_service(SyncService::new(storage).into_server());
        Self::spawn(router).await
    }

    /// A proxy forwarding to `upstream`.
    ///
    /// # Errors
    ///
    /// Returns an error if `upstream` is invalid or no local port can be
    /// bound.
    pub async fn proxy(upstream: &str) -> std::io::Result<Self> {
        let proxy = Proxy::new(upstream)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::spawn(Server::builder().add_service(proxy.into_server())).await
    }

    /// Bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://` URI of the server.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Dial the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn channel(&self) -> NotaryResult<Channel> {
        notary::connect(&self.uri()).await
    }

    /// A `Notary` client signing as `signer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn notary_client(&self, signer: &Signer) -> NotaryResult<SignedNotaryClient> {
        Ok(signer.notary_client(self.channel().await?))
    }

    /// A `Sync` client signing as `signer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn sync_client(&self, signer: &Signer) -> NotaryResult<SignedSyncClient> {
        Ok(signer.sync_client(self.channel().await?))
    }

    /// Stop serving and wait for the server task.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
