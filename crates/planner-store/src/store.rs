//! The task store: the single owner of [`PlannerState`].
//!
//! Every mutation follows the same commit path: change the aggregate, save it
//! whole under the storage key, then call each subscriber with the new state.
//! Operations on unknown ids and out-of-range reorders return without doing
//! any of the three.
//!
//! A failed save never fails the operation. The error is logged, kept in
//! [`TaskStore::persist_error`], and the in-memory state stays authoritative
//! until the next save succeeds.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use planner_core::{Clock, RuleId, TaskId};
use tracing::{debug, info, warn};

use crate::errors::{Result, StorageError, StoreError};
use crate::maintenance::{materialize_due, prune_expired};
use crate::recurrence::parse_recurrence;
use crate::storage::{Storage, validate_key};
use crate::types::{
    MaintenanceReport, PlannerState, RecurrenceKind, RecurrenceRule, ScheduleTarget, StoredState,
    Task, TaskList,
};

/// Handle returned by [`TaskStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&PlannerState) + Send>;

/// Owned planner aggregate bound to a storage backend.
pub struct TaskStore<S: Storage> {
    storage: S,
    key: String,
    clock: Arc<dyn Clock>,
    state: PlannerState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    persist_error: Option<StorageError>,
}

impl<S: Storage> std::fmt::Debug for TaskStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("persist_error", &self.persist_error)
            .finish_non_exhaustive()
    }
}

impl<S: Storage> TaskStore<S> {
    /// Bind a store to `storage` under `key`. Nothing is read until
    /// [`initialize`](Self::initialize).
    pub fn new(storage: S, key: impl Into<String>, clock: Arc<dyn Clock>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self {
            storage,
            key,
            clock,
            state: PlannerState::default(),
            listeners: Vec::new(),
            next_subscription: 0,
            persist_error: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Startup and maintenance
    // ─────────────────────────────────────────────────────────────────────

    /// Load the persisted aggregate, repair it, run maintenance, and save.
    ///
    /// Never fails: an absent snapshot seeds defaults and an unreadable one is
    /// discarded with a warning.
    pub fn initialize(&mut self) -> MaintenanceReport {
        let today = self.clock.today();
        let (state, recovered, repairs) = self.load(today);
        self.state = state;

        let mut report = self.maintain(today);
        report.recovered = recovered;
        report.repairs = repairs;

        self.save();
        if report.changed() {
            self.notify();
        }
        info!(
            key = %self.key,
            pruned = report.pruned.len(),
            generated = report.generated.len(),
            recovered,
            repairs,
            "store initialized"
        );
        report
    }

    /// Prune expired days and materialize due recurring tasks for today.
    ///
    /// Saves only when something changed, and notifies only when a day was
    /// pruned or a task generated. A second run on the same day is a no-op.
    pub fn run_maintenance(&mut self) -> MaintenanceReport {
        let today = self.clock.today();
        let reopened = self.state.last_opened != Some(today);
        let report = self.maintain(today);
        if report.changed() || reopened {
            self.save();
        }
        if report.changed() {
            self.notify();
        }
        report
    }

    fn maintain(&mut self, today: NaiveDate) -> MaintenanceReport {
        let pruned = prune_expired(&mut self.state.scheduled, today);
        let generated = materialize_due(&mut self.state, today, self.clock.now_millis());
        self.state.last_opened = Some(today);
        if !pruned.is_empty() || !generated.is_empty() {
            info!(pruned = pruned.len(), generated = generated.len(), %today, "maintenance applied");
        }
        MaintenanceReport {
            pruned,
            generated,
            ..MaintenanceReport::default()
        }
    }

    fn load(&self, today: NaiveDate) -> (PlannerState, bool, usize) {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no persisted state, seeding defaults");
                return (PlannerState::default(), false, 0);
            }
            Err(error) => {
                warn!(key = %self.key, %error, "failed to read persisted state, resetting");
                return (PlannerState::default(), true, 0);
            }
        };
        match serde_json::from_str::<StoredState>(&raw) {
            Ok(stored) => {
                let (state, repairs) = stored.into_state(today);
                if repairs > 0 {
                    info!(key = %self.key, repairs, "repaired persisted state");
                }
                (state, false, repairs)
            }
            Err(error) => {
                warn!(key = %self.key, %error, "persisted state is corrupt, resetting");
                (PlannerState::default(), true, 0)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Append a task to the ASAP list, registering a rule if `text` carries
    /// a recurrence marker.
    pub fn add_asap(&mut self, text: &str) -> Task {
        let text = self.extract_recurrence(text);
        let task = Task::new(text, self.clock.now_millis());
        self.state.asap.push(task.clone());
        debug!(task_id = %task.id, list = %TaskList::Asap, "task added");
        self.commit();
        task
    }

    /// Append a task to the bucket for `date`, creating it if needed.
    ///
    /// With `check_recurrence` false the text is used verbatim.
    pub fn add_scheduled(&mut self, text: &str, date: NaiveDate, check_recurrence: bool) -> Task {
        let text = if check_recurrence {
            self.extract_recurrence(text)
        } else {
            text.to_string()
        };
        let task = self.insert_scheduled(text, date);
        self.commit();
        task
    }

    /// Register a rule anchored on today. It counts as already generated for
    /// today.
    pub fn add_recurring(&mut self, text: &str, kind: RecurrenceKind) -> RuleId {
        let id = self.push_rule(text.to_string(), kind);
        self.commit();
        id
    }

    /// Remove a rule. Tasks it already generated stay.
    pub fn delete_recurrence(&mut self, id: &RuleId) {
        let before = self.state.recurring.len();
        self.state.recurring.retain(|rule| rule.id != *id);
        if self.state.recurring.len() == before {
            debug!(rule_id = %id, "delete of unknown rule ignored");
            return;
        }
        debug!(rule_id = %id, "rule deleted");
        self.commit();
    }

    /// Remove a task from `list`, dropping the day bucket if it empties.
    ///
    /// Returns the removed task; an unknown id is a no-op.
    pub fn remove_task(&mut self, id: &TaskId, list: TaskList) -> Option<Task> {
        let task = self.detach(id, list)?;
        debug!(task_id = %id, %list, "task removed");
        self.commit();
        Some(task)
    }

    /// Move a task from `from` into the bucket for `target`.
    ///
    /// The moved task is recreated: new id, unchecked, fresh timestamp, same
    /// text. Saves and notifies once. Returns the new task, or `None` if `id`
    /// is not in `from`.
    pub fn move_task(&mut self, id: &TaskId, from: TaskList, target: NaiveDate) -> Option<Task> {
        let old = self.detach(id, from)?;
        let task = self.insert_scheduled(old.text, target);
        debug!(old_id = %id, new_id = %task.id, %from, to = %target, "task moved");
        self.commit();
        Some(task)
    }

    /// Move the task at `from_index` to `to_index` within `list`.
    ///
    /// Either index out of range (or a day with no bucket) is a no-op.
    pub fn reorder_task(&mut self, list: TaskList, from_index: usize, to_index: usize) {
        let Some(tasks) = self.list_mut(list) else {
            return;
        };
        if from_index >= tasks.len() || to_index >= tasks.len() {
            debug!(%list, from_index, to_index, len = tasks.len(), "reorder out of range ignored");
            return;
        }
        let task = tasks.remove(from_index);
        tasks.insert(to_index, task);
        self.commit();
    }

    /// Check or uncheck a task in place. Returns whether the task was found.
    pub fn set_completed(&mut self, id: &TaskId, list: TaskList, completed: bool) -> bool {
        let Some(task) = self
            .list_mut(list)
            .and_then(|tasks| tasks.iter_mut().find(|t| t.id == *id))
        else {
            return false;
        };
        if task.completed != completed {
            task.completed = completed;
            debug!(task_id = %id, %list, completed, "task completion changed");
            self.commit();
        }
        true
    }

    /// Form entry: trim `text`, resolve `target`, then add.
    ///
    /// Fails without touching state when the text is empty or a custom day
    /// has not been picked.
    pub fn add(&mut self, text: &str, target: ScheduleTarget) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyText);
        }
        let task = match target.resolve(self.clock.today())? {
            None => self.add_asap(text),
            Some(day) => self.add_scheduled(text, day, true),
        };
        Ok(task)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Register a callback invoked with the state after every committed
    /// mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&PlannerState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drop a subscription. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────

    /// The whole aggregate.
    #[must_use]
    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    /// Undated tasks in user order.
    #[must_use]
    pub fn asap(&self) -> &[Task] {
        &self.state.asap
    }

    /// Dated tasks per day, ascending.
    #[must_use]
    pub fn scheduled(&self) -> &BTreeMap<NaiveDate, Vec<Task>> {
        &self.state.scheduled
    }

    /// Recurrence rules in insertion order.
    #[must_use]
    pub fn recurring(&self) -> &[RecurrenceRule] {
        &self.state.recurring
    }

    /// Tasks of one list.
    #[must_use]
    pub fn tasks(&self, list: TaskList) -> &[Task] {
        self.state.tasks(list)
    }

    /// The error from the most recent save, if it failed.
    #[must_use]
    pub fn persist_error(&self) -> Option<&StorageError> {
        self.persist_error.as_ref()
    }

    /// Storage key the aggregate lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Clock the store reads "today" from.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Register a rule for any marker in `text` and return the text to file.
    fn extract_recurrence(&mut self, text: &str) -> String {
        match parse_recurrence(text) {
            Some(parsed) => {
                let _ = self.push_rule(parsed.clean_text.clone(), parsed.kind);
                parsed.clean_text
            }
            None => text.to_string(),
        }
    }

    fn push_rule(&mut self, text: String, kind: RecurrenceKind) -> RuleId {
        let today = self.clock.today();
        let rule = RecurrenceRule {
            id: RuleId::generate(),
            text,
            rule: kind,
            anchor_date: today,
            last_generated: Some(today),
        };
        let id = rule.id.clone();
        debug!(rule_id = %id, kind = kind.marker(), "rule registered");
        self.state.recurring.push(rule);
        id
    }

    fn insert_scheduled(&mut self, text: String, date: NaiveDate) -> Task {
        let task = Task::new(text, self.clock.now_millis());
        self.state.scheduled.entry(date).or_default().push(task.clone());
        debug!(task_id = %task.id, list = %TaskList::Scheduled(date), "task added");
        task
    }

    /// Take a task out of `list` without saving or notifying.
    fn detach(&mut self, id: &TaskId, list: TaskList) -> Option<Task> {
        let tasks = self.list_mut(list)?;
        let index = tasks.iter().position(|t| t.id == *id)?;
        let task = tasks.remove(index);
        if let TaskList::Scheduled(day) = list {
            if self.state.scheduled.get(&day).is_some_and(Vec::is_empty) {
                let _ = self.state.scheduled.remove(&day);
            }
        }
        Some(task)
    }

    fn list_mut(&mut self, list: TaskList) -> Option<&mut Vec<Task>> {
        match list {
            TaskList::Asap => Some(&mut self.state.asap),
            TaskList::Scheduled(day) => self.state.scheduled.get_mut(&day),
        }
    }

    fn commit(&mut self) {
        self.save();
        self.notify();
    }

    fn save(&mut self) {
        let result = serde_json::to_string(&self.state)
            .map_err(|e| StorageError::Io(e.into()))
            .and_then(|json| self.storage.set_item(&self.key, &json));
        match result {
            Ok(()) => {
                if self.persist_error.take().is_some() {
                    info!(key = %self.key, "save recovered");
                }
            }
            Err(error) => {
                warn!(key = %self.key, %error, "failed to save state, keeping in-memory copy");
                self.persist_error = Some(error);
            }
        }
    }

    fn notify(&mut self) {
        let state = &self.state;
        for (_, listener) in &mut self.listeners {
            listener(state);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use assert_matches::assert_matches;
    use planner_core::FixedClock;
    use planner_core::logging::capture_logs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;

    const KEY: &str = "planner_data";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock_at(today: NaiveDate) -> Arc<FixedClock> {
        Arc::new(FixedClock::new(today))
    }

    fn open(storage: &MemoryStorage, clock: &Arc<FixedClock>) -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::new(storage.clone(), KEY, clock.clone()).unwrap();
        let _ = store.initialize();
        store
    }

    fn persisted(storage: &MemoryStorage) -> serde_json::Value {
        serde_json::from_str(&storage.get_item(KEY).unwrap().unwrap()).unwrap()
    }

    fn counter(store: &mut TaskStore<MemoryStorage>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _ = store.subscribe(move |_| {
            let _ = c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    // ── initialize ──────────────────────────────────────────────────

    #[test]
    fn empty_storage_initializes_defaults() {
        let storage = MemoryStorage::new();
        let today = day(2025, 3, 10);
        let store = open(&storage, &clock_at(today));

        assert!(store.asap().is_empty());
        assert!(store.scheduled().is_empty());
        assert!(store.recurring().is_empty());
        assert_eq!(store.state().last_opened, Some(today));

        let json = persisted(&storage);
        insta::assert_json_snapshot!(json, @r#"
        {
          "asap": [],
          "lastOpened": "2025-03-10",
          "recurring": [],
          "scheduled": {}
        }
        "#);
    }

    #[test]
    fn corrupt_snapshot_recovers_with_warning() {
        let mut storage = MemoryStorage::new();
        storage.set_item(KEY, "{not json").unwrap();
        let (logs, _guard) = capture_logs();

        let mut store = TaskStore::new(storage.clone(), KEY, clock_at(day(2025, 3, 10))).unwrap();
        let report = store.initialize();

        assert!(report.recovered);
        assert!(store.asap().is_empty());
        assert!(logs.has_event(Level::WARN, "corrupt"));
        assert_eq!(persisted(&storage)["asap"], serde_json::json!([]));
    }

    #[test]
    fn wrong_shape_is_treated_as_corrupt() {
        let mut storage = MemoryStorage::new();
        storage.set_item(KEY, r#"{"asap": "nope"}"#).unwrap();
        let mut store = TaskStore::new(storage, KEY, clock_at(day(2025, 3, 10))).unwrap();
        assert!(store.initialize().recovered);
    }

    #[test]
    fn initialize_prunes_and_generates() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                KEY,
                r#"{
                    "asap": [],
                    "scheduled": {
                        "2025-03-09": [{"id": "a", "text": "old", "completed": false, "createdAt": 1}],
                        "2025-03-11": [{"id": "b", "text": "future", "completed": false, "createdAt": 2}]
                    },
                    "recurring": [{"id": "rule-1", "text": "stretch", "rule": "d", "anchorDate": "2025-03-01", "lastGenerated": "2025-03-09"}],
                    "lastOpened": "2025-03-09"
                }"#,
            )
            .unwrap();
        let today = day(2025, 3, 10);
        let mut store = TaskStore::new(storage.clone(), KEY, clock_at(today)).unwrap();
        let report = store.initialize();

        assert_eq!(report.pruned, vec![day(2025, 3, 9)]);
        assert_eq!(report.generated.len(), 1);
        assert_eq!(store.tasks(TaskList::Scheduled(today))[0].text, "stretch");
        assert!(store.scheduled().contains_key(&day(2025, 3, 11)));
        assert_eq!(store.recurring()[0].last_generated, Some(today));
        assert_eq!(persisted(&storage)["recurring"][0]["lastGenerated"], "2025-03-10");
    }

    #[test]
    fn maintenance_twice_same_day_is_idempotent() {
        let storage = MemoryStorage::new();
        let clock = clock_at(day(2025, 3, 10));
        let mut store = open(&storage, &clock);
        let _ = store.add_recurring("journal", RecurrenceKind::Daily);
        clock.advance_days(1);

        let first = store.run_maintenance();
        let snapshot = store.state().clone();
        let notified = counter(&mut store);
        let second = store.run_maintenance();

        assert_eq!(first.generated.len(), 1);
        assert!(!second.changed());
        assert_eq!(store.state(), &snapshot);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn maintenance_notifies_subscribers_on_change() {
        let storage = MemoryStorage::new();
        let clock = clock_at(day(2025, 3, 10));
        let mut store = open(&storage, &clock);
        let _ = store.add_scheduled("today only", day(2025, 3, 10), true);
        let notified = counter(&mut store);

        clock.advance_days(1);
        let report = store.run_maintenance();

        assert_eq!(report.pruned, vec![day(2025, 3, 10)]);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(persisted(&storage)["lastOpened"], "2025-03-11");
    }

    // ── add ─────────────────────────────────────────────────────────

    #[test]
    fn add_asap_with_marker_registers_rule() {
        let storage = MemoryStorage::new();
        let today = day(2025, 3, 10);
        let mut store = open(&storage, &clock_at(today));
        let notified = counter(&mut store);

        let task = store.add_asap("stretch /w /d");

        assert_eq!(task.text, "stretch /w");
        assert_eq!(store.asap(), std::slice::from_ref(&task));
        let rule = &store.recurring()[0];
        assert_eq!(rule.rule, RecurrenceKind::Daily);
        assert_eq!(rule.text, "stretch /w");
        assert_eq!(rule.anchor_date, today);
        assert_eq!(rule.last_generated, Some(today));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn add_scheduled_without_recurrence_check_keeps_marker() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let task = store.add_scheduled("literal /m", day(2025, 3, 12), false);
        assert_eq!(task.text, "literal /m");
        assert!(store.recurring().is_empty());
    }

    #[test]
    fn add_scheduled_creates_bucket_and_persists() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let task = store.add_scheduled("Dentist", day(2025, 3, 12), true);
        assert_eq!(store.tasks(TaskList::Scheduled(day(2025, 3, 12))), &[task.clone()]);
        assert_eq!(
            persisted(&storage)["scheduled"]["2025-03-12"][0]["id"],
            task.id.as_str()
        );
    }

    #[test]
    fn ids_are_unique_within_a_millisecond() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let a = store.add_asap("a");
        let b = store.add_asap("b");
        assert_eq!(a.created_at, b.created_at);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn add_form_entry_validates() {
        let storage = MemoryStorage::new();
        let today = day(2025, 3, 10);
        let mut store = open(&storage, &clock_at(today));
        let notified = counter(&mut store);

        assert_matches!(store.add("   ", ScheduleTarget::Today), Err(StoreError::EmptyText));
        assert_matches!(
            store.add("call mom", ScheduleTarget::Custom(None)),
            Err(StoreError::MissingDate)
        );
        assert_eq!(store.state().task_count(), 0);
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        let task = store.add("  call mom ", ScheduleTarget::Tomorrow).unwrap();
        assert_eq!(task.text, "call mom");
        assert_eq!(store.tasks(TaskList::Scheduled(day(2025, 3, 11))).len(), 1);

        let _ = store.add("read", ScheduleTarget::Asap).unwrap();
        assert_eq!(store.asap().len(), 1);
    }

    // ── remove / move / reorder ─────────────────────────────────────

    #[test]
    fn removing_last_task_drops_bucket() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let list = TaskList::Scheduled(day(2025, 3, 10));
        let task = store.add_scheduled("only", day(2025, 3, 10), true);

        assert!(store.remove_task(&task.id, list).is_some());
        assert!(!store.scheduled().contains_key(&day(2025, 3, 10)));
        assert_eq!(persisted(&storage)["scheduled"], serde_json::json!({}));
    }

    #[test]
    fn remove_unknown_id_is_silent() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let notified = counter(&mut store);
        assert!(store.remove_task(&TaskId::from("ghost"), TaskList::Asap).is_none());
        assert!(
            store
                .remove_task(&TaskId::from("ghost"), TaskList::Scheduled(day(2025, 1, 1)))
                .is_none()
        );
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn move_recreates_task_and_notifies_once() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 8)));
        let original = store.add_asap("Pay bills");
        assert!(store.set_completed(&original.id, TaskList::Asap, true));
        let notified = counter(&mut store);

        let moved = store
            .move_task(&original.id, TaskList::Asap, day(2025, 3, 10))
            .unwrap();

        assert!(store.asap().iter().all(|t| t.id != original.id));
        let bucket = store.tasks(TaskList::Scheduled(day(2025, 3, 10)));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0], moved);
        assert_eq!(moved.text, "Pay bills");
        assert!(!moved.completed);
        assert_ne!(moved.id, original.id);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn move_between_days_drops_empty_source() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let task = store.add_scheduled("x", day(2025, 3, 10), true);
        let _ = store.move_task(&task.id, TaskList::Scheduled(day(2025, 3, 10)), day(2025, 3, 12));
        assert_eq!(
            store.scheduled().keys().copied().collect::<Vec<_>>(),
            vec![day(2025, 3, 12)]
        );
    }

    #[test]
    fn move_unknown_is_none() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        assert!(store.move_task(&TaskId::from("nope"), TaskList::Asap, day(2025, 3, 12)).is_none());
        assert!(store.scheduled().is_empty());
    }

    #[test]
    fn reorder_moves_by_index() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        for text in ["a", "b", "c"] {
            let _ = store.add_asap(text);
        }
        store.reorder_task(TaskList::Asap, 2, 0);
        let texts: Vec<_> = store.asap().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_out_of_bounds_is_noop() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        for text in ["a", "b", "c"] {
            let _ = store.add_asap(text);
        }
        let before = store.asap().to_vec();
        let notified = counter(&mut store);

        store.reorder_task(TaskList::Asap, 5, 0);
        store.reorder_task(TaskList::Asap, 0, 3);
        store.reorder_task(TaskList::Scheduled(day(2025, 3, 10)), 0, 0);

        assert_eq!(store.asap(), before.as_slice());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    // ── rules / completion ──────────────────────────────────────────

    #[test]
    fn delete_recurrence_keeps_generated_tasks() {
        let storage = MemoryStorage::new();
        let clock = clock_at(day(2025, 3, 10));
        let mut store = open(&storage, &clock);
        let id = store.add_recurring("water plants", RecurrenceKind::Daily);
        clock.advance_days(1);
        let _ = store.run_maintenance();

        store.delete_recurrence(&id);

        assert!(store.recurring().is_empty());
        assert_eq!(store.tasks(TaskList::Scheduled(day(2025, 3, 11))).len(), 1);
    }

    #[test]
    fn set_completed_toggles_in_place() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let task = store.add_asap("a");
        assert!(store.set_completed(&task.id, TaskList::Asap, true));
        assert!(store.asap()[0].completed);
        assert_eq!(store.asap()[0].id, task.id);
        assert!(!store.set_completed(&TaskId::from("nope"), TaskList::Asap, true));
    }

    // ── subscriptions ───────────────────────────────────────────────

    #[test]
    fn subscriber_sees_persisted_state() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let probe = storage.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let _ = store.subscribe(move |state| {
            let raw = probe.get_item(KEY).unwrap().unwrap();
            let on_disk: PlannerState = serde_json::from_str(&raw).unwrap();
            assert_eq!(&on_disk, state);
            let _ = s.fetch_add(1, Ordering::SeqCst);
        });
        let _ = store.add_asap("a");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = store.subscribe(move |_| {
            let _ = c.fetch_add(1, Ordering::SeqCst);
        });
        let _ = store.add_asap("a");
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        let _ = store.add_asap("b");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    // ── persistence failures ────────────────────────────────────────

    #[test]
    fn failed_save_keeps_memory_and_reports() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &clock_at(day(2025, 3, 10)));
        let notified = counter(&mut store);
        storage.set_quota(Some(16));
        let (logs, _guard) = capture_logs();

        let task = store.add_asap("survives in memory");

        assert_eq!(store.asap(), std::slice::from_ref(&task));
        assert_matches!(store.persist_error(), Some(StorageError::QuotaExceeded { .. }));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert!(logs.has_event(Level::WARN, "failed to save state"));
        assert_eq!(
            logs.field_of("failed to save state", "key").as_deref(),
            Some(KEY)
        );
        assert_eq!(persisted(&storage)["asap"], serde_json::json!([]));

        storage.set_quota(None);
        let _ = store.add_asap("next");
        assert!(store.persist_error().is_none());
        assert_eq!(persisted(&storage)["asap"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn invalid_key_rejected_at_construction() {
        let result = TaskStore::new(MemoryStorage::new(), "bad key", clock_at(day(2025, 3, 10)));
        assert_matches!(result, Err(StoreError::Storage(StorageError::InvalidKey(_))));
    }

    // ── legacy snapshots ────────────────────────────────────────────

    #[test]
    fn legacy_rule_without_anchor_keeps_weekly_cadence() {
        use chrono::{Local, TimeZone};

        // Created on Wednesday 2025-03-05; last fired that day.
        let created = Local
            .from_local_datetime(&day(2025, 3, 5).and_hms_opt(9, 30, 0).unwrap())
            .earliest()
            .unwrap()
            .timestamp_millis();
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                KEY,
                &format!(
                    r#"{{"asap":[],"scheduled":{{}},"recurring":[{{"id":"{created}","text":"team sync","rule":"w","lastGenerated":"2025-03-05"}}],"lastOpened":"2025-03-05"}}"#
                ),
            )
            .unwrap();

        let clock = clock_at(day(2025, 3, 13));
        let mut store = TaskStore::new(storage.clone(), KEY, clock.clone()).unwrap();
        let thursday = store.initialize();
        assert!(thursday.generated.is_empty());
        assert_eq!(thursday.repairs, 1);
        assert_eq!(store.recurring()[0].anchor_date, day(2025, 3, 5));
        assert_eq!(persisted(&storage)["recurring"][0]["anchorDate"], "2025-03-05");

        clock.set_today(day(2025, 3, 19));
        let mut reopened = TaskStore::new(storage, KEY, clock).unwrap();
        let wednesday = reopened.initialize();
        assert_eq!(wednesday.generated.len(), 1);
        assert_eq!(wednesday.repairs, 0);
    }
}
