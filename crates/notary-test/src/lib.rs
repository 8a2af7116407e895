//! Notary Test - shared test utilities for the notary crates.
//!
//! Provides key and grant fixtures plus [`TestServer`], which runs real
//! tonic servers on ephemeral local ports.
//!
//! ```rust,ignore
//! let storage = Arc::new(Memory::new());
//! let (admin, grant) = notary_test::admin();
//! storage.insert(grant).await?;
//!
//! let server = TestServer::authority(storage).await?;
//! let mut client = server.notary_client(&admin).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
