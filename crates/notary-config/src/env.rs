//! `NOTARY_*` environment overrides.

use std::collections::HashMap;

/// Environment variables and the dotted config keys they override.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("NOTARY_LISTEN", "server.listen"),
    ("NOTARY_MODE", "server.mode"),
    ("NOTARY_UPSTREAM", "server.upstream"),
    ("NOTARY_PRIVATE_KEY", "keys.private_key"),
    ("NOTARY_SEED", "keys.seed"),
    ("NOTARY_DIRECTORY", "storage.directory"),
    ("NOTARY_LOG_LEVEL", "logging.level"),
];

/// Snapshot the `NOTARY_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("NOTARY_"))
        .collect()
}

/// Write every set override into `merged`. Returns how many were applied.
pub fn apply_env_overrides(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0usize;
    for (var, path) in ENV_OVERRIDES {
        let Some(value) = env_vars.get(*var) else {
            continue;
        };
        if set_path(merged, path, toml::Value::String(value.clone())) {
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Set a dotted path, creating intermediate tables.
fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return false;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return false;
        };
        current = table
            .entry(segment)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    match current.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), value);
            true
        },
        None => false,
    }
}
