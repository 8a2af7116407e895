//! The `notary.Notary` service backed by local storage.

use std::sync::Arc;

use notary_proto::{
    Grant, GrantRequest, GrantResponse, Permission, RefreshRequest, RefreshResponse,
    RevokeRequest, RevokeResponse, SearchRequest, SearchResponse,
};
use notary_storage::{Storage, SyncStorage};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::info;

use crate::auth::Auth;
use crate::error::storage_status;
use crate::rpc::notary_server::{Notary, NotaryServer};
use crate::sync::stream_grants;

/// Serves grant administration from a store.
///
/// Every handler re-derives the caller's permission from its credential.
#[derive(Clone)]
pub struct Service {
    storage: Arc<dyn Storage>,
    sync: Option<Arc<dyn SyncStorage>>,
    auth: Auth,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("searchable", &self.sync.is_some())
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Serve from `storage`. `Search` is unavailable.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            auth: Auth::new(Arc::clone(&storage)),
            storage,
            sync: None,
        }
    }

    /// Serve from enumerable `storage`, with `Search` enabled.
    #[must_use]
    pub fn with_sync<T: SyncStorage + 'static>(storage: Arc<T>) -> Self {
        let sync: Arc<dyn SyncStorage> = storage.clone();
        Self {
            sync: Some(sync),
            ..Self::new(storage)
        }
    }

    /// Wrap in the generated tonic server.
    #[must_use]
    pub fn into_server(self) -> NotaryServer<Self> {
        NotaryServer::new(self)
    }
}

#[tonic::async_trait]
impl Notary for Service {
    async fn grant(
        &self,
        request: Request<GrantRequest>,
    ) -> Result<Response<GrantResponse>, Status> {
        self.auth
            .require(request.metadata(), Permission::GRANT)
            .await?;

        let grant = request
            .into_inner()
            .grant
            .ok_or_else(|| Status::invalid_argument("missing grant"))?;
        let stored = self.storage.insert(grant).await.map_err(storage_status)?;

        info!(
            fingerprint = %stored.fingerprint,
            permission = %stored.permission_or_none(),
            "stored grant"
        );
        Ok(Response::new(GrantResponse {
            grant: Some(stored),
        }))
    }

    async fn revoke(
        &self,
        request: Request<RevokeRequest>,
    ) -> Result<Response<RevokeResponse>, Status> {
        self.auth
            .require(request.metadata(), Permission::REVOKE)
            .await?;

        let fingerprint = request.into_inner().fingerprint;
        let removed = self
            .storage
            .delete(Grant {
                fingerprint,
                ..Grant::default()
            })
            .await
            .map_err(storage_status)?;

        info!(fingerprint = %removed.fingerprint, "revoked grant");
        Ok(Response::new(RevokeResponse {
            grant: Some(removed),
        }))
    }

    async fn refresh(
        &self,
        request: Request<RefreshRequest>,
    ) -> Result<Response<RefreshResponse>, Status> {
        self.auth
            .require(request.metadata(), Permission::REFRESH)
            .await?;
        Err(Status::unimplemented("refresh is not supported"))
    }

    type SearchStream = ReceiverStream<Result<SearchResponse, Status>>;

    async fn search(
        &self,
        request: Request<SearchRequest>,
    ) -> Result<Response<Self::SearchStream>, Status> {
        self.auth
            .require(request.metadata(), Permission::SEARCH)
            .await?;

        let Some(sync) = self.sync.as_ref() else {
            return Err(Status::unimplemented("search requires enumerable storage"));
        };
        Ok(Response::new(stream_grants(
            Arc::clone(sync),
            |_| false,
            |grants| SearchResponse { grants },
        )))
    }
}
