//! Notary Telemetry - logging setup for the notary daemon and tools.
//!
//! Library crates only emit `tracing` events; binaries call
//! [`setup_logging`] once at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use notary_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), notary_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("notary_storage=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
