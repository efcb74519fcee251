//! Recurrence markers and due-rule evaluation.
//!
//! Task text may carry one of three inline markers: `/d` (daily), `/w`
//! (weekly), `/m` (monthly). Entering such text registers a
//! [`RecurrenceRule`] and files the task under the cleaned text.
//!
//! # Marker contract
//!
//! Markers are checked in the fixed order daily → weekly → monthly, not by
//! position in the text. The first kind present wins and only its first
//! occurrence is removed. Any other marker stays in the cleaned text
//! verbatim, so `"stretch /w /d"` becomes a daily rule for `"stretch /w"`.
//!
//! # Generation policy
//!
//! A rule fires at most once per day and never backfills: if the planner was
//! not opened for three weeks, a weekly rule produces one task on the next
//! qualifying day, not three.

use chrono::{Datelike, NaiveDate};
use planner_core::RuleId;
use planner_core::dates::local_day_of_millis;

use crate::types::{RecurrenceKind, RecurrenceRule};

/// Result of a successful marker match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedRecurrence {
    /// Cadence of the consumed marker.
    pub kind: RecurrenceKind,
    /// Text with that marker removed and surrounding whitespace trimmed.
    pub clean_text: String,
}

/// Extract the highest-priority recurrence marker from `text`.
///
/// Returns `None` when no marker is present.
#[must_use]
pub fn parse_recurrence(text: &str) -> Option<ParsedRecurrence> {
    RecurrenceKind::PRIORITY
        .into_iter()
        .find(|kind| text.contains(kind.marker()))
        .map(|kind| ParsedRecurrence {
            kind,
            clean_text: text.replacen(kind.marker(), "", 1).trim().to_string(),
        })
}

/// Whether `rule` should materialize a task on `today`.
///
/// A rule that never generated behaves as if it last fired at the epoch.
#[must_use]
pub fn should_generate_task(rule: &RecurrenceRule, today: NaiveDate) -> bool {
    if rule.last_generated.is_some_and(|last| last >= today) {
        return false;
    }
    match rule.rule {
        RecurrenceKind::Daily => true,
        RecurrenceKind::Weekly => today.weekday() == rule.anchor_date.weekday(),
        RecurrenceKind::Monthly => today.day() == rule.anchor_date.day(),
    }
}

/// Anchor for a rule persisted before anchors were stored explicitly.
///
/// Older snapshots used the creation timestamp (epoch milliseconds) as the
/// rule id; that instant's local day is the anchor. Ids that are not
/// timestamps fall back to `last_generated`, then to `today`.
#[must_use]
pub fn legacy_anchor(id: &RuleId, last_generated: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    id.as_str()
        .parse::<i64>()
        .ok()
        .and_then(local_day_of_millis)
        .or(last_generated)
        .unwrap_or(today)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
