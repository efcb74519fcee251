//! # planner-core
//!
//! Foundation types and utilities shared by every planner crate.
//!
//! - **Branded IDs**: `TaskId` and `RuleId` as newtypes for type safety
//! - **Dates**: canonical `YYYY-MM-DD` local calendar days, the [`Clock`]
//!   abstraction, and display labels for agenda headings
//! - **Logging**: `tracing` subscriber setup and a log-capture helper for tests

#![deny(unsafe_code)]

pub mod dates;
pub mod ids;
pub mod logging;

pub use dates::{Clock, DateError, DayLabels, FixedClock, SystemClock};
pub use ids::{RuleId, TaskId};
