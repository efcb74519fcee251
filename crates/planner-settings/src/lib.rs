//! # planner-settings
//!
//! Configuration management with layered sources for the planner.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PlannerSettings::default()`]
//! 2. **User file**: `~/.planner/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PLANNER_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<PlannerSettings> = OnceLock::new();

/// Get the process-wide settings.
///
/// The first call loads `~/.planner/settings.json` with env overrides and
/// falls back to compiled defaults if loading fails; later calls return the
/// cached value.
pub fn get_settings() -> &'static PlannerSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            PlannerSettings::default()
        })
    })
}

/// Install specific settings before anything calls [`get_settings`].
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: PlannerSettings) -> std::result::Result<(), PlannerSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
