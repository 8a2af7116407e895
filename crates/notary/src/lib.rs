//! Notary - credential issuance, verification and grant synchronization.
//!
//! A notary node stores *grants*: public keys bound to a [`Permission`]
//! set. Clients prove their identity on every call with a short-lived token
//! signed by their key ([`Signer`]), and the node checks it against its
//! store ([`Auth`]) before serving:
//!
//! - [`Service`]: the `notary.Notary` administration service
//! - [`Proxy`]: the same surface forwarded to an upstream node
//! - [`SyncService`] and [`Replicator`]: Bloom-filter driven replication of
//!   grants between nodes over `notary.Sync`
//!
//! [`Permission`]: notary_proto::Permission

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::result_large_err)]

pub mod auth;
pub mod client;
pub mod sync;

mod error;
mod proxy;
mod service;
mod signer;

/// Generated gRPC clients and servers.
#[allow(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
pub mod rpc {
    include!(concat!(env!("OUT_DIR"), "/notary.Notary.rs"));
    include!(concat!(env!("OUT_DIR"), "/notary.Sync.rs"));
}

pub use auth::{AUTHORIZATION_KEY, Auth, AuthChecker};
pub use client::{SignedNotaryClient, SignedSyncClient, connect};
pub use error::{NotaryError, NotaryResult, storage_status};
pub use proxy::Proxy;
pub use service::Service;
pub use signer::Signer;
pub use sync::{BloomFilter, Replicator, SyncService};
