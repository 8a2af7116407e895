//! Layered configuration for the notary daemon.
//!
//! # Usage
//!
//! ```rust,no_run
//! use notary_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("/etc/notary/notary.toml"))).unwrap();
//! println!("listening on {}", config.server.listen);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`NOTARY_*`, see [`env::ENV_OVERRIDES`])
//! 2. **Config file** (the path passed to [`Config::load`])
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal notary crates**.
//! Conversion from config types to domain types (permissions, storage
//! backends) happens in the daemon.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration from embedded defaults, `path` (if it exists) and
    /// the process environment, then validate it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }
}
