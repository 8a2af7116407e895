//! A `notary.Notary` front end that forwards to an upstream notary.

use tokio::sync::OnceCell;
use tonic::codec::Streaming;
use tonic::transport::{Channel, Endpoint};
use tonic::{Extensions, Request, Response, Status};
use tracing::{debug, warn};

use notary_proto::{
    GrantRequest, GrantResponse, RefreshRequest, RefreshResponse, RevokeRequest, RevokeResponse,
    SearchRequest, SearchResponse,
};

use crate::client::endpoint;
use crate::error::NotaryResult;
use crate::rpc::notary_client::NotaryClient;
use crate::rpc::notary_server::{Notary, NotaryServer};

/// Forwards every call, with the caller's metadata, to one upstream.
///
/// Holds no storage and does no authorization of its own; the upstream
/// verifies the forwarded credential.
#[derive(Debug)]
pub struct Proxy {
    endpoint: Endpoint,
    channel: OnceCell<Channel>,
}

impl Proxy {
    /// Proxy to `upstream`, dialled on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `upstream` is not a valid URI.
    pub fn new(upstream: &str) -> NotaryResult<Self> {
        Ok(Self::from_endpoint(endpoint(upstream)?))
    }

    /// Proxy to a preconfigured endpoint.
    #[must_use]
    pub fn from_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            channel: OnceCell::new(),
        }
    }

    /// Wrap in the generated tonic server.
    #[must_use]
    pub fn into_server(self) -> NotaryServer<Self> {
        NotaryServer::new(self)
    }

    async fn upstream(&self) -> Result<NotaryClient<Channel>, Status> {
        let channel = self
            .channel
            .get_or_try_init(|| async {
                debug!(uri = %self.endpoint.uri(), "dialling upstream");
                self.endpoint.connect().await
            })
            .await
            .map_err(|e| {
                warn!(uri = %self.endpoint.uri(), error = %e, "upstream unreachable");
                Status::unavailable(format!("upstream unavailable: {e}"))
            })?;
        Ok(NotaryClient::new(channel.clone()))
    }
}

/// Carry the inbound metadata onto the outbound request.
fn forward<T>(request: Request<T>) -> Request<T> {
    let (metadata, _, message) = request.into_parts();
    Request::from_parts(metadata, Extensions::default(), message)
}

#[tonic::async_trait]
impl Notary for Proxy {
    async fn grant(
        &self,
        request: Request<GrantRequest>,
    ) -> Result<Response<GrantResponse>, Status> {
        self.upstream().await?.grant(forward(request)).await
    }

    async fn revoke(
        &self,
        request: Request<RevokeRequest>,
    ) -> Result<Response<RevokeResponse>, Status> {
        self.upstream().await?.revoke(forward(request)).await
    }

    async fn refresh(
        &self,
        request: Request<RefreshRequest>,
    ) -> Result<Response<RefreshResponse>, Status> {
        self.upstream().await?.refresh(forward(request)).await
    }

    type SearchStream = Streaming<SearchResponse>;

    async fn search(
        &self,
        request: Request<SearchRequest>,
    ) -> Result<Response<Self::SearchStream>, Status> {
        self.upstream().await?.search(forward(request)).await
    }
}
