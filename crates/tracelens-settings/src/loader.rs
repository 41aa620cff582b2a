//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::TracelensSettings;

/// Resolve the path to the settings file (`~/.tracelens/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tracelens").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TracelensSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or values are errors.
pub fn load_settings_from_path(path: &Path) -> Result<TracelensSettings> {
    let defaults = serde_json::to_value(TracelensSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TracelensSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TRACELENS_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides<F>(settings: &mut TracelensSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read_string = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = read_string("TRACELENS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_string("TRACELENS_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn_invalid("TRACELENS_LOG_JSON", &v),
        }
    }
    if let Some(v) = read_string("TRACELENS_OLD_DATA_THRESHOLD_SECS") {
        match parse_u64_range(&v, 1, 86_400 * 365) {
            Some(n) => settings.pipeline.old_data_threshold_secs = n,
            None => warn_invalid("TRACELENS_OLD_DATA_THRESHOLD_SECS", &v),
        }
    }
    if let Some(v) = read_string("TRACELENS_YIELD_DELAY_MS") {
        match parse_u64_range(&v, 0, 1_000) {
            Some(n) => settings.presentation.yield_delay_ms = n,
            None => warn_invalid("TRACELENS_YIELD_DELAY_MS", &v),
        }
    }
    if let Some(v) = read_string("TRACELENS_CROSS_TOOL") {
        match parse_bool(&v) {
            Some(b) => settings.bridges.cross_tool_enabled = b,
            None => warn_invalid("TRACELENS_CROSS_TOOL", &v),
        }
    }
    if let Some(v) = read_string("TRACELENS_ATTACHMENTS_DIR") {
        settings.bridges.attachments_dir = Some(v);
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
