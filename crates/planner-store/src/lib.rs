//! # planner-store
//!
//! The planner's stateful core: an owned task aggregate persisted whole to a
//! local key/value store after every mutation.
//!
//! - [`maintenance`]: expired-day pruning and recurring-task materialization
//! - [`recurrence`]: `/d` `/w` `/m` marker parsing and due-rule evaluation
//! - [`store`]: [`TaskStore`] with load/repair, maintenance, mutations, and
//!   synchronous change notification
//! - [`storage`]: the [`Storage`] trait and memory, file, and `SQLite` backends
//! - [`completion`]: delayed removal of checked tasks
//! - [`agenda`]: read-only day grouping for rendering
//! - [`session`]: build a ready store from [`planner_settings::PlannerSettings`]

#![deny(unsafe_code)]

pub mod agenda;
pub mod completion;
pub mod errors;
pub mod maintenance;
pub mod recurrence;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;

pub use agenda::{AgendaDay, agenda, summary};
pub use completion::PendingRemovals;
pub use errors::{Result, StorageError, StoreError};
pub use session::{DynTaskStore, init_logging, open_store, open_store_with_clock};
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::{SubscriptionId, TaskStore};
pub use types::{
    MaintenanceReport, PlannerState, RecurrenceKind, RecurrenceRule, ScheduleTarget, Task,
    TaskList,
};
