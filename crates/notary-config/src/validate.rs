//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, ServerMode};

/// Capability names accepted in bucket permissions.
pub const PERMISSION_NAMES: &[&str] = &[
    "grant", "revoke", "search", "refresh", "sync", "deploy", "all", "none",
];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_keys(config)?;
    validate_storage(config)?;
    validate_server(config)?;
    validate_sync(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_keys(config: &Config) -> ConfigResult<()> {
    if config.keys.private_key.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "keys.private_key".to_owned(),
            message: "private key path must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    if config
        .storage
        .directory
        .as_deref()
        .is_some_and(|dir| dir.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "storage.directory".to_owned(),
            message: "directory must not be empty when set".to_owned(),
        });
    }

    for (index, bucket) in config.storage.buckets.iter().enumerate() {
        if bucket.path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("storage.buckets[{index}].path"),
                message: "bucket path must not be empty".to_owned(),
            });
        }
        for name in bucket.permission.names() {
            if !PERMISSION_NAMES.contains(&name.trim().to_ascii_lowercase().as_str()) {
                return Err(ConfigError::ValidationError {
                    field: format!("storage.buckets[{index}].permission"),
                    message: format!(
                        "unknown permission '{name}'; expected one of: {}",
                        PERMISSION_NAMES.join(", ")
                    ),
                });
            }
        }
    }
    Ok(())
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let s = &config.server;

    if s.listen.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::ValidationError {
            field: "server.listen".to_owned(),
            message: format!("'{}' is not a socket address", s.listen),
        });
    }

    let has_upstream = s.upstream.as_deref().is_some_and(|u| !u.trim().is_empty());
    if s.mode == ServerMode::Proxy && !has_upstream {
        return Err(ConfigError::ValidationError {
            field: "server.upstream".to_owned(),
            message: "proxy mode requires an upstream".to_owned(),
        });
    }
    Ok(())
}

fn validate_sync(config: &Config) -> ConfigResult<()> {
    let s = &config.sync;

    if s.interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "sync.interval_secs".to_owned(),
            message: "interval_secs must be greater than 0".to_owned(),
        });
    }

    if s.expected_grants == 0 {
        return Err(ConfigError::ValidationError {
            field: "sync.expected_grants".to_owned(),
            message: "expected_grants must be greater than 0".to_owned(),
        });
    }

    if !(s.false_positive_rate > 0.0 && s.false_positive_rate < 1.0) {
        return Err(ConfigError::ValidationError {
            field: "sync.false_positive_rate".to_owned(),
            message: format!(
                "false_positive_rate {} is out of range; must be between 0 and 1 exclusive",
                s.false_positive_rate
            ),
        });
    }

    if let Some(peer) = s.peers.iter().find(|peer| peer.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "sync.peers".to_owned(),
            message: format!("peer URI must not be empty: {peer:?}"),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BucketConfig, PermissionSpec};

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_proxy_requires_upstream() {
        let mut config = Config::default();
        config.server.mode = ServerMode::Proxy;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "server.upstream"));

        config.server.upstream = Some("http://10.0.0.1:7443".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_listen_address() {
        let mut config = Config::default();
        config.server.listen = "localhost".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_interval() {
        let mut config = Config::default();
        config.sync.interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_false_positive_rate_bounds() {
        let mut config = Config::default();
        for rate in [0.0, 1.0, -0.5, f64::NAN] {
            config.sync.false_positive_rate = rate;
            assert!(validate(&config).is_err(), "{rate}");
        }
        config.sync.false_positive_rate = 0.01;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_expected_grants() {
        let mut config = Config::default();
        config.sync.expected_grants = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_permission_name() {
        let mut config = Config::default();
        config.storage.buckets.push(BucketConfig {
            path: "/etc/notary/authorized_keys".to_owned(),
            permission: PermissionSpec::List(vec!["grant".to_owned(), "fly".to_owned()]),
        });
        assert!(validate(&config).is_err());

        config.storage.buckets[0].permission = PermissionSpec::Single("ALL".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }
}
