//! Error types for storage backends and store operations.
//!
//! Most store failure modes are deliberately not errors: unknown task ids and
//! out-of-range reorders are no-ops, corrupt snapshots are recovered, and a
//! failed save is logged while the in-memory state stays authoritative. What
//! remains here is input validation and backend construction.

use planner_core::DateError;
use thiserror::Error;

/// Errors raised by a [`crate::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The write would push the backend past its byte quota.
    #[error("quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the backend would hold after the write.
        needed: usize,
        /// Configured quota.
        quota: usize,
    },

    /// Key is empty or contains characters outside `[A-Za-z0-9_.-]`.
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// Errors returned by [`crate::TaskStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Task text is empty after trimming.
    #[error("task text is empty")]
    EmptyText,

    /// A custom schedule target was chosen but no date was picked.
    #[error("no target date selected")]
    MissingDate,

    /// A picked date is not a canonical calendar day.
    #[error(transparent)]
    InvalidDate(#[from] DateError),

    /// Backend construction or key validation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
