//! Client connections to notary peers.

use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Channel, Endpoint};

use crate::error::{NotaryError, NotaryResult};
use crate::rpc::notary_client::NotaryClient;
use crate::rpc::sync_client::SyncClient;
use crate::signer::Signer;

/// A `Notary` client that signs every call.
pub type SignedNotaryClient = NotaryClient<InterceptedService<Channel, Signer>>;

/// A `Sync` client that signs every call.
pub type SignedSyncClient = SyncClient<InterceptedService<Channel, Signer>>;

/// Parse a peer address such as `http://10.0.0.2:7443`.
///
/// # Errors
///
/// Returns [`NotaryError::InvalidUri`] if `uri` is not a valid URI.
pub fn endpoint(uri: &str) -> NotaryResult<Endpoint> {
    Endpoint::from_shared(uri.to_owned()).map_err(|e| NotaryError::InvalidUri(format!("{uri}: {e}")))
}

/// Dial a peer.
///
/// # Errors
///
/// Returns an error if the address is invalid or the connection fails.
pub async fn connect(uri: &str) -> NotaryResult<Channel> {
    Ok(endpoint(uri)?.connect().await?)
}

impl Signer {
    /// A `Notary` client over `channel` carrying this signer's credentials.
    #[must_use]
    pub fn notary_client(&self, channel: Channel) -> SignedNotaryClient {
        NotaryClient::with_interceptor(channel, self.clone())
    }

    /// A `Sync` client over `channel` carrying this signer's credentials.
    #[must_use]
    pub fn sync_client(&self, channel: Channel) -> SignedSyncClient {
        SyncClient::with_interceptor(channel, self.clone())
    }
}
