//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a user
//! file may contain any subset of fields and the rest come from [`Default`].

use std::path::PathBuf;

use planner_core::DayLabels;
use planner_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "storage": { "backend": "sqlite", "path": "/home/me/.planner/planner.db" },
///   "completion": { "removalDelayMs": 800 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    /// Settings schema version.
    pub version: String,
    /// Where the planner state is persisted.
    pub storage: StorageSettings,
    /// Completion-removal behavior.
    pub completion: CompletionSettings,
    /// Day heading labels and locale.
    pub display: DisplaySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            storage: StorageSettings::default(),
            completion: CompletionSettings::default(),
            display: DisplaySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Which storage backend holds the persisted aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory only; nothing survives a restart.
    Memory,
    /// One JSON file per storage key inside a directory.
    File,
    /// A key/value table in a `SQLite` database file.
    Sqlite,
}

/// Storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Backend kind.
    pub backend: StorageBackend,
    /// Directory (file backend) or database path (sqlite backend).
    pub path: String,
    /// Key the aggregate is stored under.
    pub key: String,
    /// Byte quota for the memory backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: planner_home().join("data").to_string_lossy().into_owned(),
            key: "planner_data".to_string(),
            quota_bytes: None,
        }
    }
}

/// What unchecking a task does while its removal is still pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UncheckPolicy {
    /// Uncheck cancels the pending removal.
    #[default]
    CancelRemoval,
    /// Uncheck clears the checkmark but the removal still happens.
    KeepRemoval,
}

/// Completion-removal settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings {
    /// Delay between checking a task and removing it.
    pub removal_delay_ms: u64,
    /// Behavior when a task is unchecked inside the delay window.
    pub uncheck_policy: UncheckPolicy,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            removal_delay_ms: 500,
            uncheck_policy: UncheckPolicy::CancelRemoval,
        }
    }
}

/// Day heading settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// POSIX locale for weekday and month names.
    pub locale: String,
    /// Heading for the current day.
    pub today_label: String,
    /// Heading for the next day.
    pub tomorrow_label: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let labels = DayLabels::default();
        Self {
            locale: labels.locale,
            today_label: labels.today,
            tomorrow_label: labels.tomorrow,
        }
    }
}

impl DisplaySettings {
    /// Labels in the shape the date helpers take.
    #[must_use]
    pub fn day_labels(&self) -> DayLabels {
        DayLabels {
            today: self.today_label.clone(),
            tomorrow: self.tomorrow_label.clone(),
            locale: self.locale.clone(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`..`error`); `RUST_LOG` wins when set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Base directory for planner files (`~/.planner`).
pub fn planner_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".planner")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: PlannerSettings =
            serde_json::from_str(r#"{"completion": {"uncheckPolicy": "keepRemoval"}}"#).unwrap();
        assert_eq!(settings.completion.uncheck_policy, UncheckPolicy::KeepRemoval);
        assert_eq!(settings.completion.removal_delay_ms, 500);
        assert_eq!(settings.storage.key, "planner_data");
    }

    #[test]
    fn backend_wire_names() {
        let json = serde_json::to_string(&StorageBackend::Sqlite).unwrap();
        insta::assert_snapshot!(json, @r#""sqlite""#);
    }

    #[test]
    fn display_maps_to_day_labels() {
        let display = DisplaySettings {
            locale: "en_US".to_string(),
            today_label: "Today".to_string(),
            tomorrow_label: "Tomorrow".to_string(),
        };
        let labels = display.day_labels();
        assert_eq!(labels.today, "Today");
        assert_eq!(labels.locale, "en_US");
    }

    #[test]
    fn quota_omitted_when_unset() {
        let value = serde_json::to_value(StorageSettings::default()).unwrap();
        assert!(value.get("quotaBytes").is_none());
        assert_eq!(value["backend"], "file");
    }
}
