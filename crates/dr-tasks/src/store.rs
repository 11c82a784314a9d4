//! Concurrent in-memory task storage.
//!
//! [`TaskStore`] maps task IDs to [`TaskRecord`]s behind a single
//! `parking_lot::RwLock`. Every mutation runs to completion under the write
//! lock, so a reader always sees a whole record: a completed task always
//! carries its documents and stats, a failed one its error.
//!
//! Readers get clones. Document lists live in an `Arc<[DocumentRecord]>`,
//! so cloning a completed record does not copy extracted text.
//!
//! # Retention
//!
//! With a [`TaskConfig`] that sets `retention_secs` or `max_tasks`, terminal
//! tasks are evicted on every [`create`](TaskStore::create). Pending and
//! running tasks are never evicted.

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeDelta, Utc};
use dr_core::{
    fx_hash_map, AggregateStats, DocumentRecord, FxHashMap, FxHashSet, ScanStats, TaskConfig,
    TaskId, TaskRecord, TaskStatus, TaskSummary,
};
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::error::TaskError;

#[derive(Debug, Default)]
struct StoreInner {
    tasks: FxHashMap<TaskId, TaskRecord>,
    /// Task IDs in creation order.
    order: Vec<TaskId>,
}

/// Process-wide task registry shared between the service and its runners.
///
/// # Examples
///
/// ```
/// use dr_core::{TaskConfig, TaskStatus};
/// use dr_tasks::TaskStore;
///
/// let store = TaskStore::new(TaskConfig::default());
/// let task = store.create("/data/docs".into(), 50);
/// assert_eq!(task.status(), TaskStatus::Pending);
///
/// store.mark_running(task.task_id())?;
/// store.mark_failed(task.task_id(), "Folder path does not exist: /data/docs")?;
///
/// let task = store.get(task.task_id())?;
/// assert_eq!(task.status(), TaskStatus::Failed);
/// assert!(task.completed_at().is_some());
/// # Ok::<(), dr_tasks::TaskError>(())
/// ```
#[derive(Debug, Default)]
pub struct TaskStore {
    inner: RwLock<StoreInner>,
    /// Woken whenever a task reaches a terminal status.
    terminal: Notify,
    config: TaskConfig,
}

impl TaskStore {
    /// Creates an empty store with the given retention policy.
    #[must_use]
    pub fn new(config: TaskConfig) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                tasks: fx_hash_map(),
                order: Vec::new(),
            }),
            terminal: Notify::new(),
            config,
        }
    }

    /// Inserts a fresh `Pending` task and returns a copy of it.
    ///
    /// Applies the retention policy afterwards.
    pub fn create(&self, folder_path: Utf8PathBuf, max_file_size_mb: u32) -> TaskRecord {
        let now = Utc::now();
        let task = TaskRecord::new(TaskId::generate(), folder_path, max_file_size_mb, now);
        let task_id = task.task_id();

        let mut inner = self.inner.write();
        inner.tasks.insert(task_id, task.clone());
        inner.order.push(task_id);
        let evicted = prune_locked(&mut inner, self.config, now);
        drop(inner);

        debug!(task_id = %task_id, folder = %task.folder_path(), evicted, "Created task");
        task
    }

    /// Returns a copy of the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown ID.
    pub fn get(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        self.inner
            .read()
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(TaskError::NotFound(task_id))
    }

    /// Applies `mutation` to the task under the write lock.
    ///
    /// Waiters in [`wait_terminal`](Self::wait_terminal) are woken if the
    /// mutation moved the task into a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown ID.
    pub fn update<F, R>(&self, task_id: TaskId, mutation: F) -> Result<R, TaskError>
    where
        F: FnOnce(&mut TaskRecord) -> R,
    {
        let mut inner = self.inner.write();
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskError::NotFound(task_id))?;

        let was_terminal = task.is_terminal();
        let result = mutation(task);
        let now_terminal = task.is_terminal();
        drop(inner);

        if now_terminal && !was_terminal {
            self.terminal.notify_waiters();
        }
        Ok(result)
    }

    /// Moves the task `Pending → Running`.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotFound`] or [`TaskError::IllegalTransition`].
    pub fn mark_running(&self, task_id: TaskId) -> Result<(), TaskError> {
        self.update(task_id, |task| task.start(Utc::now()))?
            .map_err(|e| TaskError::illegal_transition(task_id, e))
    }

    /// Moves the task `Running → Completed` with its results.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotFound`] or [`TaskError::IllegalTransition`].
    pub fn mark_completed(
        &self,
        task_id: TaskId,
        documents: Vec<DocumentRecord>,
        stats: ScanStats,
    ) -> Result<(), TaskError> {
        self.update(task_id, |task| task.complete(documents, stats, Utc::now()))?
            .map_err(|e| TaskError::illegal_transition(task_id, e))
    }

    /// Moves the task `Running → Failed` with an error message.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotFound`] or [`TaskError::IllegalTransition`].
    pub fn mark_failed(&self, task_id: TaskId, error: impl Into<String>) -> Result<(), TaskError> {
        self.update(task_id, |task| task.fail(error, Utc::now()))?
            .map_err(|e| TaskError::illegal_transition(task_id, e))
    }

    /// Fails a task whose runner went away before recording an outcome.
    ///
    /// A `Pending` task passes through `Running` so its timestamps stay
    /// consistent. Returns `false` if the task was already terminal.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotFound`] for an unknown ID.
    pub fn mark_abandoned(&self, task_id: TaskId, error: &str) -> Result<bool, TaskError> {
        self.update(task_id, |task| {
            let now = Utc::now();
            if task.status() == TaskStatus::Pending && task.start(now).is_err() {
                return false;
            }
            task.fail(error, now).is_ok()
        })
    }

    /// Lists task summaries in creation order, optionally filtered by status.
    #[must_use]
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<TaskSummary> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id))
            .filter(|task| status.is_none_or(|wanted| task.status() == wanted))
            .map(TaskRecord::summary)
            .collect()
    }

    /// Folds aggregate counters over every stored task.
    #[must_use]
    pub fn aggregate_stats(&self) -> AggregateStats {
        AggregateStats::from_records(self.inner.read().tasks.values())
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().tasks.len()
    }

    /// Returns `true` if no tasks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().tasks.is_empty()
    }

    /// Evicts terminal tasks according to the retention policy.
    ///
    /// Returns the number of tasks removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let evicted = prune_locked(&mut self.inner.write(), self.config, now);
        if evicted > 0 {
            info!(evicted, "Pruned terminal tasks");
        }
        evicted
    }

    /// Waits until the task is `Completed` or `Failed` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown ID.
    pub async fn wait_terminal(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        loop {
            // Register before checking so a transition in between still wakes us
            let notified = self.terminal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let task = self.get(task_id)?;
            if task.is_terminal() {
                return Ok(task);
            }
            notified.await;
        }
    }
}

fn prune_locked(inner: &mut StoreInner, config: TaskConfig, now: DateTime<Utc>) -> usize {
    let mut evict: FxHashSet<TaskId> = FxHashSet::default();

    if let Some(ttl) = config
        .retention_secs
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(TimeDelta::try_seconds)
    {
        for task in inner.tasks.values() {
            if task
                .completed_at()
                .is_some_and(|done| now.signed_duration_since(done) >= ttl)
            {
                evict.insert(task.task_id());
            }
        }
    }

    if let Some(max_tasks) = config.max_tasks {
        let mut excess = (inner.tasks.len() - evict.len()).saturating_sub(max_tasks);
        for id in &inner.order {
            if excess == 0 {
                break;
            }
            let terminal = inner.tasks.get(id).is_some_and(TaskRecord::is_terminal);
            if terminal && evict.insert(*id) {
                excess -= 1;
            }
        }
    }

    if evict.is_empty() {
        return 0;
    }
    inner.tasks.retain(|id, _| !evict.contains(id));
    inner.order.retain(|id| !evict.contains(id));
    evict.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn finish(store: &TaskStore, id: TaskId) {
        store.mark_running(id).unwrap();
        store.mark_completed(id, Vec::new(), ScanStats::new()).unwrap();
    }

    #[test]
    fn test_create_and_get() {
        let store = TaskStore::default();
        let task = store.create("/data".into(), 50);

        let fetched = store.get(task.task_id()).unwrap();
        assert_eq!(fetched, task);
        assert_eq!(fetched.status(), TaskStatus::Pending);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = TaskStore::default();
        assert!(store.get(TaskId::generate()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_lifecycle_forward_only() {
        let store = TaskStore::default();
        let id = store.create("/data".into(), 50).task_id();

        // Cannot skip Running
        let err = store.mark_completed(id, Vec::new(), ScanStats::new()).unwrap_err();
        assert!(matches!(err, TaskError::IllegalTransition { .. }));

        store.mark_running(id).unwrap();
        store.mark_failed(id, "boom").unwrap();
        let completed_at = store.get(id).unwrap().completed_at();

        // Terminal is final, and completed_at is set only once
        assert!(store.mark_running(id).is_err());
        assert!(store.mark_failed(id, "again").is_err());
        let task = store.get(id).unwrap();
        assert_eq!(task.error(), Some("boom"));
        assert_eq!(task.completed_at(), completed_at);
    }

    #[test]
    fn test_mark_abandoned_from_any_live_status() {
        let store = TaskStore::default();
        let pending = store.create("/a".into(), 50).task_id();
        let running = store.create("/b".into(), 50).task_id();
        store.mark_running(running).unwrap();

        assert!(store.mark_abandoned(pending, "gone").unwrap());
        assert!(store.mark_abandoned(running, "gone").unwrap());

        let task = store.get(pending).unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("gone"));
        assert!(task.started_at().is_some());
        assert!(task.completed_at().is_some());
        assert_eq!(store.get(running).unwrap().status(), TaskStatus::Failed);

        // Terminal records are left alone
        assert!(!store.mark_abandoned(pending, "again").unwrap());
        assert_eq!(store.get(pending).unwrap().error(), Some("gone"));
        assert!(store.mark_abandoned(TaskId::generate(), "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_in_creation_order_with_filter() {
        let store = TaskStore::default();
        let a = store.create("/a".into(), 50).task_id();
        let b = store.create("/b".into(), 50).task_id();
        let c = store.create("/c".into(), 50).task_id();
        finish(&store, b);
        store.mark_running(c).unwrap();

        let all: Vec<_> = store.list(None).iter().map(|s| s.task_id).collect();
        assert_eq!(all, [a, b, c]);

        let completed = store.list(Some(TaskStatus::Completed));
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].task_id, b);
        assert_eq!(completed[0].folder_path.as_str(), "/b");

        assert_eq!(store.list(Some(TaskStatus::Running))[0].task_id, c);
        assert_eq!(store.list(Some(TaskStatus::Failed)).len(), 0);
    }

    #[test]
    fn test_aggregate_stats_counts_terminal_tasks() {
        let store = TaskStore::default();
        let done = store.create("/done".into(), 50).task_id();
        let failed = store.create("/failed".into(), 50).task_id();
        store.create("/pending".into(), 50);

        store.mark_running(done).unwrap();
        let docs = vec![
            DocumentRecord::new("/done/a.txt".into(), 3, "one two".to_owned(), Some("utf-8")),
            DocumentRecord::new("/done/b.txt".into(), 5, "three".to_owned(), Some("utf-8")),
        ];
        store.mark_completed(done, docs, ScanStats::new()).unwrap();
        store.mark_running(failed).unwrap();
        store.mark_failed(failed, "nope").unwrap();

        let stats = store.aggregate_stats();
        assert_eq!(
            stats,
            AggregateStats {
                total_tasks: 3,
                completed_tasks: 1,
                failed_tasks: 1,
                total_documents: 2,
                total_words: 3,
            }
        );
    }

    #[test]
    fn test_max_tasks_evicts_oldest_terminal_only() {
        let store = TaskStore::new(TaskConfig {
            retention_secs: None,
            max_tasks: Some(2),
        });
        let running = store.create("/running".into(), 50).task_id();
        store.mark_running(running).unwrap();
        let old_done = store.create("/old".into(), 50).task_id();
        finish(&store, old_done);

        // Third create overflows the cap; only the terminal task can go
        let newest = store.create("/new".into(), 50).task_id();

        assert_eq!(store.len(), 2);
        assert!(store.get(running).is_ok());
        assert!(store.get(newest).is_ok());
        assert!(store.get(old_done).unwrap_err().is_not_found());
    }

    #[test]
    fn test_cap_never_evicts_live_tasks() {
        let store = TaskStore::new(TaskConfig {
            retention_secs: None,
            max_tasks: Some(1),
        });
        store.create("/a".into(), 50);
        store.create("/b".into(), 50);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_retention_ttl() {
        let store = TaskStore::new(TaskConfig {
            retention_secs: Some(60),
            max_tasks: None,
        });
        let done = store.create("/done".into(), 50).task_id();
        finish(&store, done);
        let pending = store.create("/pending".into(), 50).task_id();

        assert_eq!(store.prune(Utc::now()), 0);

        let later = Utc::now() + TimeDelta::seconds(61);
        assert_eq!(store.prune(later), 1);
        assert!(store.get(done).is_err());
        assert!(store.get(pending).is_ok());
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_unbounded_by_default() {
        let store = TaskStore::default();
        for i in 0..20 {
            let id = store.create(format!("/f{i}").into(), 50).task_id();
            finish(&store, id);
        }
        assert_eq!(store.prune(Utc::now() + TimeDelta::days(365)), 0);
        assert_eq!(store.len(), 20);
    }

    #[tokio::test]
    async fn test_wait_terminal_wakes_on_completion() {
        let store = Arc::new(TaskStore::default());
        let id = store.create("/data".into(), 50).task_id();
        store.mark_running(id).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait_terminal(id).await })
        };
        tokio::task::yield_now().await;

        store.mark_completed(id, Vec::new(), ScanStats::new()).unwrap();
        let task = waiter.await.unwrap().unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_wait_terminal_returns_immediately_when_done() {
        let store = TaskStore::default();
        let id = store.create("/data".into(), 50).task_id();
        finish(&store, id);
        assert!(store.wait_terminal(id).await.unwrap().is_terminal());
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_records() {
        let store = Arc::new(TaskStore::default());
        let id = store.create("/data".into(), 50).task_id();
        store.mark_running(id).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let task = store.get(id).unwrap();
                        match task.status() {
                            TaskStatus::Completed => {
                                assert!(task.documents().is_some());
                                assert!(task.stats().is_some());
                                assert!(task.completed_at().is_some());
                            }
                            TaskStatus::Running => assert!(task.documents().is_none()),
                            other => panic!("unexpected status {other}"),
                        }
                    }
                })
            })
            .collect();

        let docs = vec![DocumentRecord::new("/data/a.txt".into(), 1, "a".to_owned(), None)];
        store.mark_completed(id, docs, ScanStats::new()).unwrap();

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
