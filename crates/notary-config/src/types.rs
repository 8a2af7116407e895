//! Configuration types for the notary daemon.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node key material.
    pub keys: KeysConfig,
    /// Grant storage.
    pub storage: StorageSection,
    /// gRPC listener and serving mode.
    pub server: ServerSection,
    /// Peer reconciliation.
    pub sync: SyncSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// KeysConfig
// ---------------------------------------------------------------------------

/// Where the node's ed25519 key lives.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Private key path. The public key is written next to it as
    /// `<private_key>.pub`. Generated on first start when missing.
    pub private_key: String,
    /// Deterministic seed used when the key has to be generated. Empty or
    /// absent means a random key.
    #[serde(skip_serializing)]
    pub seed: Option<String>,
}

impl KeysConfig {
    /// The seed bytes, if a non-empty seed is configured.
    #[must_use]
    pub fn seed_bytes(&self) -> Option<&[u8]> {
        self.seed
            .as_deref()
            .filter(|seed| !seed.is_empty())
            .map(str::as_bytes)
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            private_key: "/var/lib/notary/id_ed25519".to_owned(),
            seed: None,
        }
    }
}

impl fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysConfig")
            .field("private_key", &self.private_key)
            .field("has_seed", &self.seed_bytes().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Grant storage: one mutable primary plus read-only buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory for the primary store. `None` keeps grants in memory.
    pub directory: Option<String>,
    /// Authorized-keys files consulted after the primary, in order.
    pub buckets: Vec<BucketConfig>,
}

/// A watched authorized-keys file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Path of the authorized-keys file.
    pub path: String,
    /// Capabilities granted to every key in the file.
    #[serde(default)]
    pub permission: PermissionSpec,
}

/// Capability names, either a list or a single name such as `"all"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionSpec {
    /// One name, e.g. `"all"`.
    Single(String),
    /// Several names, e.g. `["grant", "revoke"]`.
    List(Vec<String>),
}

impl PermissionSpec {
    /// The configured names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::List(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for PermissionSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// How the node serves the `Notary` API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Serve from local storage, including the `Sync` service.
    #[default]
    Authority,
    /// Forward every call to `server.upstream`.
    Proxy,
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority => write!(f, "authority"),
            Self::Proxy => write!(f, "proxy"),
        }
    }
}

/// gRPC listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address to listen on.
    pub listen: String,
    /// Serving mode.
    pub mode: ServerMode,
    /// Upstream authority URI, required in proxy mode.
    pub upstream: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7443".to_owned(),
            mode: ServerMode::Authority,
            upstream: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncSection
// ---------------------------------------------------------------------------

/// Periodic pull from peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Peer URIs to pull from.
    pub peers: Vec<String>,
    /// Seconds between pulls from each peer.
    pub interval_secs: u64,
    /// Expected number of grants, sizing the Bloom filter.
    pub expected_grants: usize,
    /// Target Bloom filter false-positive rate.
    pub false_positive_rate: f64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            interval_secs: 30,
            expected_grants: 10_000,
            false_positive_rate: 0.001,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["notary_storage=debug",
    /// "h2=warn"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
