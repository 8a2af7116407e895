//! Grant replication between notary nodes.
//!
//! A [`Replicator`] sends a Bloom filter of the fingerprints it already
//! holds; the peer's [`SyncService`] answers with every grant the filter
//! does not contain.

mod bloom;
mod replicator;
mod service;
mod stream;

pub use bloom::BloomFilter;
pub use replicator::{DEFAULT_EXPECTED_GRANTS, DEFAULT_FALSE_POSITIVE_RATE, Replicator};
pub use service::SyncService;

pub(crate) use stream::stream_grants;
