//! Notary Storage - where grants live.
//!
//! Every backend implements [`Storage`] (`lookup`/`insert`/`delete` keyed by
//! fingerprint). Backends that can list their contents also implement
//! [`SyncStorage`], which the sync protocol and `Search` use to enumerate.
//!
//! # Backends
//!
//! - [`Memory`]: a locked `HashMap`, for tests and snapshots
//! - [`Directory`]: one length-delimited protobuf file per fingerprint
//! - [`File`]: a watched authorized-keys file granting a fixed permission
//! - [`Composite`]: a mutable primary in front of read-only buckets
//!
//! Every insert path normalises the grant with
//! [`Grant::ensure_defaults`](notary_proto::Grant::ensure_defaults) first.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod composite;
pub mod directory;
pub mod error;
pub mod file;
pub mod memory;
mod storage;

pub use composite::Composite;
pub use directory::Directory;
pub use error::{StorageError, StorageResult};
pub use file::File;
pub use memory::Memory;
pub use storage::{Storage, SyncStorage};
