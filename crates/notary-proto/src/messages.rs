//! Protobuf message definitions.
//!
//! Field tags are part of the wire contract and must never be reused.

/// Capability flags held by a grant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Permission {
    /// May add grants.
    #[prost(bool, tag = "1")]
    pub grant: bool,
    /// May remove grants.
    #[prost(bool, tag = "2")]
    pub revoke: bool,
    /// May enumerate grants.
    #[prost(bool, tag = "3")]
    pub search: bool,
    /// May rotate transport credentials.
    #[prost(bool, tag = "4")]
    pub refresh: bool,
    /// May pull grants from a peer.
    #[prost(bool, tag = "5")]
    pub sync: bool,
    /// May drive deployments.
    #[prost(bool, tag = "6")]
    pub deploy: bool,
}

/// A stored credential: a public key bound to a permission set.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Grant {
    /// Authorized-key line of the public key.
    #[prost(bytes = "vec", tag = "1")]
    pub authorization: Vec<u8>,
    /// Capabilities; absent means none.
    #[prost(message, optional, tag = "2")]
    pub permission: Option<Permission>,
    /// `hex(SHA256(authorization))`, recomputed on every insert.
    #[prost(string, tag = "3")]
    pub fingerprint: String,
}

/// The signed portion of a request credential.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Token {
    /// 128 random bits, fresh per request.
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    /// Fingerprint of the signing key.
    #[prost(string, tag = "2")]
    pub fingerprint: String,
    /// Unix seconds at issue.
    #[prost(int64, tag = "3")]
    pub issued: i64,
    /// Unix seconds after which the token is rejected.
    #[prost(int64, tag = "4")]
    pub expires: i64,
}

/// A signature over a token's signing payload.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Signature {
    /// Algorithm tag, e.g. `ssh-ed25519`.
    #[prost(string, tag = "1")]
    pub format: String,
    /// Raw signature bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// A token together with its signature, as carried in request metadata.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Authorization {
    /// The token.
    #[prost(message, optional, tag = "1")]
    pub token: Option<Token>,
    /// Signature over the token.
    #[prost(message, optional, tag = "2")]
    pub signature: Option<Signature>,
}

/// `Notary/Grant` request.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GrantRequest {
    /// Grant to store.
    #[prost(message, optional, tag = "1")]
    pub grant: Option<Grant>,
}

/// `Notary/Grant` response.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GrantResponse {
    /// The grant as stored.
    #[prost(message, optional, tag = "1")]
    pub grant: Option<Grant>,
}

/// `Notary/Revoke` request.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RevokeRequest {
    /// Fingerprint of the grant to remove.
    #[prost(string, tag = "1")]
    pub fingerprint: String,
}

/// `Notary/Revoke` response.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RevokeResponse {
    /// The removed grant.
    #[prost(message, optional, tag = "1")]
    pub grant: Option<Grant>,
}

/// `Notary/Refresh` request.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RefreshRequest {}

/// `Notary/Refresh` response.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RefreshResponse {
    /// Certificate authority bundle.
    #[prost(bytes = "vec", tag = "1")]
    pub authority: Vec<u8>,
    /// Private key for the issued certificate.
    #[prost(bytes = "vec", tag = "2")]
    pub private_key: Vec<u8>,
    /// Issued certificate.
    #[prost(bytes = "vec", tag = "3")]
    pub certificate: Vec<u8>,
}

/// `Notary/Search` request.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SearchRequest {}

/// One chunk of `Notary/Search` results.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SearchResponse {
    /// Grants in this chunk.
    #[prost(message, repeated, tag = "1")]
    pub grants: Vec<Grant>,
}

/// `Sync/Stream` request.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SyncRequest {
    /// Serialized Bloom filter of fingerprints the requester already holds.
    #[prost(bytes = "vec", tag = "1")]
    pub bloom: Vec<u8>,
}

/// A batch of grants.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Chunk {
    /// Grants in this batch.
    #[prost(message, repeated, tag = "1")]
    pub grants: Vec<Grant>,
}

/// One message of a `Sync/Stream` response.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SyncStream {
    /// Message body.
    #[prost(oneof = "sync_stream::Payload", tags = "1")]
    pub payload: Option<sync_stream::Payload>,
}

/// Nested types for [`SyncStream`].
pub mod sync_stream {
    /// Body of a [`SyncStream`](super::SyncStream) message.
    #[derive(Clone, PartialEq, Eq, ::prost::Oneof)]
    pub enum Payload {
        /// A batch of grants.
        #[prost(message, tag = "1")]
        Chunk(super::Chunk),
    }
}
