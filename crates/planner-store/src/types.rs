//! Planner data model.
//!
//! All persisted types use camelCase field names so a snapshot is the same
//! JSON object shape the browser build of the planner writes. Scheduled days
//! are keyed by [`NaiveDate`], which serializes to the canonical
//! `YYYY-MM-DD` string and iterates in day order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use planner_core::dates::{format_iso, next_day, parse_iso};
use planner_core::{RuleId, TaskId};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::recurrence::legacy_anchor;

/// A single to-do entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within its list.
    pub id: TaskId,
    /// Display text with any recurrence marker already stripped.
    pub text: String,
    /// Checked off but not yet removed.
    #[serde(default)]
    pub completed: bool,
    /// Creation instant, Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

impl Task {
    /// A fresh, unchecked task with a newly generated id.
    #[must_use]
    pub fn new(text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: TaskId::generate(),
            text: text.into(),
            completed: false,
            created_at,
        }
    }
}

/// Cadence of a recurrence rule.
///
/// Persisted as the single-letter marker body (`"d"`, `"w"`, `"m"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrenceKind {
    /// Every day.
    #[serde(rename = "d", alias = "daily")]
    Daily,
    /// Same weekday as the anchor.
    #[serde(rename = "w", alias = "weekly")]
    Weekly,
    /// Same day-of-month as the anchor.
    #[serde(rename = "m", alias = "monthly")]
    Monthly,
}

impl RecurrenceKind {
    /// Marker priority: the first kind whose marker appears wins.
    pub const PRIORITY: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// The inline text marker (`/d`, `/w`, `/m`).
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Daily => "/d",
            Self::Weekly => "/w",
            Self::Monthly => "/m",
        }
    }

    /// Badge shown in the rule management list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Diario",
            Self::Weekly => "Semanal",
            Self::Monthly => "Mensual",
        }
    }
}

/// Standing instruction to materialize a task on qualifying days.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// Rule identity.
    pub id: RuleId,
    /// Text of every generated task.
    pub text: String,
    /// Cadence.
    pub rule: RecurrenceKind,
    /// Day whose weekday / day-of-month the cadence follows.
    pub anchor_date: NaiveDate,
    /// Last day a task was materialized (or the creation day).
    pub last_generated: Option<NaiveDate>,
}

/// Root aggregate: everything the planner persists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerState {
    /// Undated tasks in user order.
    pub asap: Vec<Task>,
    /// Dated tasks per day; no day maps to an empty list.
    pub scheduled: BTreeMap<NaiveDate, Vec<Task>>,
    /// Recurrence rules in insertion order.
    pub recurring: Vec<RecurrenceRule>,
    /// Most recent session start.
    pub last_opened: Option<NaiveDate>,
}

impl PlannerState {
    /// Tasks of one list (empty for a day with no bucket).
    #[must_use]
    pub fn tasks(&self, list: TaskList) -> &[Task] {
        match list {
            TaskList::Asap => &self.asap,
            TaskList::Scheduled(day) => self.scheduled.get(&day).map(Vec::as_slice).unwrap_or_default(),
        }
    }

    /// Total number of tasks across every list.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.asap.len() + self.scheduled.values().map(Vec::len).sum::<usize>()
    }
}

/// Which list a task lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskList {
    /// The undated bucket.
    Asap,
    /// The bucket for one day.
    Scheduled(NaiveDate),
}

impl fmt::Display for TaskList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asap => f.write_str("asap"),
            Self::Scheduled(day) => write!(f, "scheduled:{}", format_iso(*day)),
        }
    }
}

/// Where a newly entered task should go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleTarget {
    /// The undated bucket.
    Asap,
    /// Today's bucket.
    Today,
    /// Tomorrow's bucket.
    Tomorrow,
    /// A picked day; `None` while nothing has been picked.
    Custom(Option<NaiveDate>),
}

impl ScheduleTarget {
    /// Target for a date-picker value; an empty value means "not picked yet".
    pub fn from_picker(value: &str) -> Result<Self, StoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::Custom(None));
        }
        Ok(Self::Custom(Some(parse_iso(value)?)))
    }

    /// Resolve to a concrete day (`None` for ASAP).
    pub fn resolve(self, today: NaiveDate) -> Result<Option<NaiveDate>, StoreError> {
        match self {
            Self::Asap => Ok(None),
            Self::Today => Ok(Some(today)),
            Self::Tomorrow => Ok(Some(next_day(today))),
            Self::Custom(Some(day)) => Ok(Some(day)),
            Self::Custom(None) => Err(StoreError::MissingDate),
        }
    }
}

/// Outcome of a maintenance pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Expired days removed from the schedule.
    pub pruned: Vec<NaiveDate>,
    /// Rules that fired, paired with the task each produced.
    pub generated: Vec<(RuleId, TaskId)>,
    /// The persisted snapshot was unreadable and defaults were used.
    pub recovered: bool,
    /// Number of structural repairs applied while loading.
    pub repairs: usize,
}

impl MaintenanceReport {
    /// Whether the pass changed anything subscribers could observe.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.pruned.is_empty() || !self.generated.is_empty() || self.recovered || self.repairs > 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted snapshot (lenient read side)
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot as read from storage, before repairs.
///
/// Every substructure may be missing or `null` (both read as `None`); rules
/// may lack an anchor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredState {
    #[serde(default)]
    asap: Option<Vec<Task>>,
    #[serde(default)]
    scheduled: Option<BTreeMap<NaiveDate, Vec<Task>>>,
    #[serde(default)]
    recurring: Option<Vec<StoredRule>>,
    #[serde(default)]
    last_opened: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRule {
    id: RuleId,
    text: String,
    rule: RecurrenceKind,
    #[serde(default)]
    anchor_date: Option<NaiveDate>,
    #[serde(default)]
    last_generated: Option<NaiveDate>,
}

impl StoredState {
    /// Repair into a valid aggregate, returning the number of fixes applied.
    pub(crate) fn into_state(self, today: NaiveDate) -> (PlannerState, usize) {
        let mut repairs = 0;
        let asap = self.asap.unwrap_or_else(|| {
            repairs += 1;
            Vec::new()
        });
        let mut scheduled = self.scheduled.unwrap_or_else(|| {
            repairs += 1;
            BTreeMap::new()
        });
        let before = scheduled.len();
        scheduled.retain(|_, tasks| !tasks.is_empty());
        repairs += before - scheduled.len();

        let recurring = self
            .recurring
            .unwrap_or_else(|| {
                repairs += 1;
                Vec::new()
            })
            .into_iter()
            .map(|stored| {
                let anchor_date = stored.anchor_date.unwrap_or_else(|| {
                    repairs += 1;
                    legacy_anchor(&stored.id, stored.last_generated, today)
                });
                RecurrenceRule {
                    id: stored.id,
                    text: stored.text,
                    rule: stored.rule,
                    anchor_date,
                    last_generated: stored.last_generated,
                }
            })
            .collect();

        let state = PlannerState {
            asap,
            scheduled,
            recurring,
            last_opened: self.last_opened,
        };
        (state, repairs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
