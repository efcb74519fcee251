//! Build a ready-to-use store from settings.

use std::path::PathBuf;
use std::sync::Arc;

use planner_core::logging::init_subscriber;
use planner_core::{Clock, SystemClock};
use planner_settings::{PlannerSettings, StorageBackend};
use tracing::info;

use crate::errors::Result;
use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
use crate::store::TaskStore;
use crate::types::MaintenanceReport;

/// Store over whichever backend the settings select.
pub type DynTaskStore = TaskStore<Box<dyn Storage>>;

/// Install the stderr log subscriber at the configured level and format.
pub fn init_logging(settings: &PlannerSettings) {
    init_subscriber(&settings.logging.level, settings.logging.format);
}

/// Open the configured backend with the system clock and initialize.
pub fn open_store(settings: &PlannerSettings) -> Result<(DynTaskStore, MaintenanceReport)> {
    open_store_with_clock(settings, Arc::new(SystemClock))
}

/// Like [`open_store`] with an explicit clock.
pub fn open_store_with_clock(
    settings: &PlannerSettings,
    clock: Arc<dyn Clock>,
) -> Result<(DynTaskStore, MaintenanceReport)> {
    let storage = build_storage(settings)?;
    let mut store = TaskStore::new(storage, settings.storage.key.clone(), clock)?;
    let report = store.initialize();
    info!(
        backend = ?settings.storage.backend,
        tasks = store.state().task_count(),
        rules = store.recurring().len(),
        "session opened"
    );
    Ok((store, report))
}

/// Construct the storage backend named in `settings`.
pub fn build_storage(settings: &PlannerSettings) -> Result<Box<dyn Storage>> {
    let storage = &settings.storage;
    let backend: Box<dyn Storage> = match storage.backend {
        StorageBackend::Memory => Box::new(match storage.quota_bytes {
            Some(quota) => MemoryStorage::with_quota(quota),
            None => MemoryStorage::new(),
        }),
        StorageBackend::File => Box::new(FileStorage::open(PathBuf::from(&storage.path))?),
        StorageBackend::Sqlite => Box::new(SqliteStorage::open(&storage.path)?),
    };
    Ok(backend)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
