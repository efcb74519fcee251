//! Delayed removal of checked tasks.
//!
//! Checking a task marks it completed right away and schedules its removal
//! after a short delay, giving the user a window to change their mind. The
//! caller drives time: it passes `now` into [`PendingRemovals::check`] and
//! calls [`PendingRemovals::flush_due`] when the next deadline passes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use planner_core::TaskId;
use planner_settings::{CompletionSettings, UncheckPolicy};
use tracing::debug;

use crate::storage::Storage;
use crate::store::TaskStore;
use crate::types::{Task, TaskList};

#[derive(Clone, Copy, Debug)]
struct Pending {
    list: TaskList,
    deadline: Instant,
}

/// Checked tasks waiting to be removed.
#[derive(Debug)]
pub struct PendingRemovals {
    delay: Duration,
    policy: UncheckPolicy,
    pending: HashMap<TaskId, Pending>,
}

impl PendingRemovals {
    /// Empty queue with the given delay and uncheck policy.
    #[must_use]
    pub fn new(delay: Duration, policy: UncheckPolicy) -> Self {
        Self {
            delay,
            policy,
            pending: HashMap::new(),
        }
    }

    /// Empty queue configured from settings.
    #[must_use]
    pub fn from_settings(settings: &CompletionSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.removal_delay_ms),
            settings.uncheck_policy,
        )
    }

    /// Mark a task completed and schedule its removal at `now + delay`.
    ///
    /// Returns `false` (and schedules nothing) if the task is not in `list`.
    pub fn check<S: Storage>(
        &mut self,
        store: &mut TaskStore<S>,
        id: &TaskId,
        list: TaskList,
        now: Instant,
    ) -> bool {
        if !store.set_completed(id, list, true) {
            return false;
        }
        let deadline = now + self.delay;
        debug!(task_id = %id, %list, delay_ms = self.delay.as_millis(), "removal scheduled");
        let _ = self.pending.insert(id.clone(), Pending { list, deadline });
        true
    }

    /// Clear a task's checkmark.
    ///
    /// Under [`UncheckPolicy::CancelRemoval`] a pending removal is dropped;
    /// under [`UncheckPolicy::KeepRemoval`] it still happens on schedule.
    pub fn uncheck<S: Storage>(&mut self, store: &mut TaskStore<S>, id: &TaskId, list: TaskList) -> bool {
        let found = store.set_completed(id, list, false);
        if self.policy == UncheckPolicy::CancelRemoval && self.pending.remove(id).is_some() {
            debug!(task_id = %id, %list, "pending removal cancelled");
        }
        found
    }

    /// Remove every task whose deadline is at or before `now`, earliest
    /// deadline first. Tasks that vanished in the meantime are skipped.
    pub fn flush_due<S: Storage>(&mut self, now: Instant, store: &mut TaskStore<S>) -> Vec<Task> {
        let mut due: Vec<(TaskId, Pending)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, p)| (id.clone(), *p))
            .collect();
        due.sort_by_key(|(_, p)| p.deadline);

        let mut removed = Vec::with_capacity(due.len());
        for (id, pending) in due {
            let _ = self.pending.remove(&id);
            if let Some(task) = store.remove_task(&id, pending.list) {
                removed.push(task);
            }
        }
        removed
    }

    /// Earliest outstanding deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Whether a removal is scheduled for `id`.
    #[must_use]
    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of scheduled removals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
