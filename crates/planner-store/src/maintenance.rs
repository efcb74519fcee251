//! The daily maintenance pass.
//!
//! Both steps are pure functions over [`PlannerState`]; the store decides
//! when to persist and notify.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use planner_core::{RuleId, TaskId};

use crate::recurrence::should_generate_task;
use crate::types::{PlannerState, Task};

/// Remove every scheduled day strictly earlier than `today`.
///
/// Returns the pruned days in ascending order.
pub fn prune_expired(scheduled: &mut BTreeMap<NaiveDate, Vec<Task>>, today: NaiveDate) -> Vec<NaiveDate> {
    let kept = scheduled.split_off(&today);
    std::mem::replace(scheduled, kept).into_keys().collect()
}

/// Materialize one task in today's bucket for every due rule.
///
/// Rules are visited in insertion order and their stored text is used as is.
/// Each rule that fires has `last_generated` advanced to `today`, so a second
/// call on the same day generates nothing.
pub fn materialize_due(state: &mut PlannerState, today: NaiveDate, now_millis: i64) -> Vec<(RuleId, TaskId)> {
    let mut generated = Vec::new();
    for rule in &mut state.recurring {
        if !should_generate_task(rule, today) {
            continue;
        }
        let task = Task::new(rule.text.clone(), now_millis);
        generated.push((rule.id.clone(), task.id.clone()));
        state.scheduled.entry(today).or_default().push(task);
        rule.last_generated = Some(today);
    }
    generated
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
