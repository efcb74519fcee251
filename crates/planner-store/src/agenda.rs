//! Read-only day grouping for rendering.
//!
//! The agenda always shows today and tomorrow, even when empty, followed by
//! every later day that has tasks. Days are ascending.

use std::fmt::Write as _;

use chrono::NaiveDate;
use planner_core::DayLabels;
use planner_core::dates::{display_label, next_day};

use crate::types::{PlannerState, Task};

/// One heading of the agenda and the tasks under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgendaDay<'a> {
    /// Calendar day.
    pub date: NaiveDate,
    /// Heading text (`Hoy`, `Mañana`, or a localized weekday and date).
    pub label: String,
    /// Tasks in user order; empty for a placeholder today/tomorrow.
    pub tasks: &'a [Task],
}

/// Days to render for `state` as of `today`.
#[must_use]
pub fn agenda<'a>(state: &'a PlannerState, today: NaiveDate, labels: &DayLabels) -> Vec<AgendaDay<'a>> {
    let tomorrow = next_day(today);
    let mut days: Vec<NaiveDate> = state
        .scheduled
        .iter()
        .filter(|(_, tasks)| !tasks.is_empty())
        .map(|(date, _)| *date)
        .collect();
    for fixed in [today, tomorrow] {
        if let Err(pos) = days.binary_search(&fixed) {
            days.insert(pos, fixed);
        }
    }

    days.into_iter()
        .map(|date| AgendaDay {
            date,
            label: display_label(date, today, labels),
            tasks: state.scheduled.get(&date).map(Vec::as_slice).unwrap_or_default(),
        })
        .collect()
}

/// Plain-text rendering of the ASAP list, the agenda, and the rules.
#[must_use]
pub fn summary(state: &PlannerState, today: NaiveDate, labels: &DayLabels) -> String {
    let mut out = String::new();
    write_section(&mut out, "ASAP", &state.asap);
    for day in agenda(state, today, labels) {
        write_section(&mut out, &day.label, day.tasks);
    }
    let _ = writeln!(out, "Recurrentes ({})", state.recurring.len());
    for rule in &state.recurring {
        let _ = writeln!(out, "  [{}] {}", rule.rule.label(), rule.text);
    }
    out
}

fn write_section(out: &mut String, heading: &str, tasks: &[Task]) {
    let _ = writeln!(out, "{heading} ({})", tasks.len());
    for task in tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "  [{mark}] {}", task.text);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
