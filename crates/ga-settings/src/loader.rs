//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::GaSettings;

/// Resolve the path to the settings file (`~/.ga-server/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ga-server").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON, or a merged result that
/// fails [`GaSettings::validate`], is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GaSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

/// Defaults with the file at `path` merged over them, no env overrides.
pub fn load_file_layer(path: &Path) -> Result<GaSettings> {
    let defaults = serde_json::to_value(GaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
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

/// Apply `GA_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored. Taking the lookup as a closure
/// keeps this testable without touching the process environment.
pub fn apply_overrides<F>(settings: &mut GaSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = read_string(&lookup, "GA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_ranged(&lookup, "GA_PORT", 1, 65_535) {
        settings.server.port = u16::try_from(v).unwrap_or(settings.server.port);
    }
    if let Some(v) = read_string(&lookup, "GA_TITLE") {
        settings.server.title = v;
    }
    if let Some(v) = read_ranged(&lookup, "GA_MAX_CONNECTIONS", 1, 100_000) {
        settings.server.max_connections =
            usize::try_from(v).unwrap_or(settings.server.max_connections);
    }
    if let Some(v) = read_ranged(&lookup, "GA_HEARTBEAT_INTERVAL", 1, 3_600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_string(&lookup, "GA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_string(&lookup, "GA_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

fn read_string<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty())
}

fn read_ranged<F>(lookup: &F, name: &str, min: u64, max: u64) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
