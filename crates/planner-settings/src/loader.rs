//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PlannerSettings::default()`]
//! 2. If `~/.planner/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `PLANNER_*` environment variable overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{PlannerSettings, StorageBackend, planner_home};

/// Resolve the path to the settings file (`~/.planner/settings.json`).
pub fn settings_path() -> PathBuf {
    planner_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PlannerSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PlannerSettings> {
    let defaults = serde_json::to_value(PlannerSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PlannerSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
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
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PLANNER_*` environment overrides.
///
/// Invalid values are ignored with a warning and the file/default value stays.
pub fn apply_env_overrides(settings: &mut PlannerSettings) {
    if let Some(v) = read_env_string("PLANNER_STORAGE_BACKEND") {
        match parse_backend(&v) {
            Some(backend) => settings.storage.backend = backend,
            None => tracing::warn!(key = "PLANNER_STORAGE_BACKEND", value = %v, "unknown storage backend, ignoring"),
        }
    }
    if let Some(v) = read_env_string("PLANNER_STORAGE_PATH") {
        settings.storage.path = v;
    }
    if let Some(v) = read_env_string("PLANNER_STORAGE_KEY") {
        settings.storage.key = v;
    }
    if let Some(v) = read_env_u64("PLANNER_REMOVAL_DELAY_MS", 0, 60_000) {
        settings.completion.removal_delay_ms = v;
    }
    if let Some(v) = read_env_string("PLANNER_LOCALE") {
        settings.display.locale = v;
    }
    if let Some(v) = read_env_string("PLANNER_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Reject settings the store cannot run with.
pub fn validate(settings: &PlannerSettings) -> Result<()> {
    if settings.storage.key.trim().is_empty() {
        return Err(SettingsError::InvalidValue {
            field: "storage.key",
            reason: "must not be empty".to_string(),
        });
    }
    if settings.storage.backend != StorageBackend::Memory && settings.storage.path.trim().is_empty()
    {
        return Err(SettingsError::InvalidValue {
            field: "storage.path",
            reason: "must not be empty for persistent backends".to_string(),
        });
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a backend name (case-insensitive).
pub fn parse_backend(val: &str) -> Option<StorageBackend> {
    match val.to_lowercase().as_str() {
        "memory" => Some(StorageBackend::Memory),
        "file" => Some(StorageBackend::File),
        "sqlite" => Some(StorageBackend::Sqlite),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
