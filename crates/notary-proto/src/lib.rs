//! Notary Proto - wire messages for the notary credential subsystem.
//!
//! Every message here is a protobuf message (via `prost`) shared by the
//! `notary.Notary` and `notary.Sync` gRPC services, the storage backends
//! and the token codec. The [`Grant`] and [`Permission`] messages also
//! carry the credential model itself: see [`Grant::ensure_defaults`] for
//! the normalisation every store applies on insert, and
//! [`Token::signing_payload`] for the bytes a request signature covers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod grant;
mod messages;
mod permission;
mod token;

pub use error::{ProtoError, ProtoResult};
pub use messages::{
    Authorization, Chunk, Grant, GrantRequest, GrantResponse, Permission, RefreshRequest,
    RefreshResponse, RevokeRequest, RevokeResponse, SearchRequest, SearchResponse, Signature,
    SyncRequest, SyncStream, Token, sync_stream,
};
pub use token::{TOKEN_ID_LEN, TOKEN_LIFETIME_SECS, unix_now};
