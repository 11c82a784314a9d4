//! Task records and their state machine.
//!
//! A [`TaskRecord`] pairs request metadata with a [`TaskState`]. The state is
//! a sum type, so a completed task always carries documents and stats and a
//! failed task always carries an error message. Transitions go through
//! [`TaskRecord::start`], [`TaskRecord::complete`], and [`TaskRecord::fail`],
//! which reject anything other than `Pending → Running → {Completed | Failed}`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::DocumentRecord;
use super::stats::ScanStats;
use super::status::TaskStatus;

/// An opaque, unique task identifier.
///
/// # Examples
///
/// ```
/// use dr_core::TaskId;
///
/// let id = TaskId::generate();
/// let parsed: TaskId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh random identifier.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A rejected status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task transition from {from} to {to}")]
pub struct TransitionError {
    /// Status the task was in.
    pub from: TaskStatus,
    /// Status the caller tried to move to.
    pub to: TaskStatus,
}

/// The lifecycle state of a task, including its outcome once terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a runner.
    Pending,
    /// Being scanned.
    Running,
    /// Finished; every successfully extracted document plus pass statistics.
    Completed {
        /// Extracted documents in scan order.
        documents: Arc<[DocumentRecord]>,
        /// Statistics for the pass, including non-fatal errors.
        stats: ScanStats,
    },
    /// Aborted by a fatal error.
    Failed {
        /// Human-readable description of the failure.
        error: String,
    },
}

impl TaskState {
    /// The status tag of this state.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::Running => TaskStatus::Running,
            Self::Completed { .. } => TaskStatus::Completed,
            Self::Failed { .. } => TaskStatus::Failed,
        }
    }
}

/// One asynchronous scan request and everything known about it.
///
/// # Examples
///
/// ```
/// use dr_core::{ScanStats, TaskId, TaskRecord, TaskStatus};
/// use camino::Utf8PathBuf;
/// use chrono::Utc;
///
/// let mut task = TaskRecord::new(TaskId::generate(), Utf8PathBuf::from("/data"), 50, Utc::now());
/// assert_eq!(task.status(), TaskStatus::Pending);
///
/// task.start(Utc::now())?;
/// task.complete(Vec::new(), ScanStats::new(), Utc::now())?;
/// assert_eq!(task.status(), TaskStatus::Completed);
/// assert!(task.completed_at().is_some());
///
/// // No transition leaves a terminal state
/// assert!(task.fail("late", Utc::now()).is_err());
/// # Ok::<(), dr_core::TransitionError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    task_id: TaskId,
    folder_path: Utf8PathBuf,
    max_file_size_mb: u32,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    state: TaskState,
}

impl TaskRecord {
    /// Creates a `Pending` record.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        folder_path: Utf8PathBuf,
        max_file_size_mb: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            folder_path,
            max_file_size_mb,
            created_at,
            started_at: None,
            completed_at: None,
            state: TaskState::Pending,
        }
    }

    /// Moves `Pending → Running`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] from any other state.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_status(TaskStatus::Pending, TaskStatus::Running)?;
        self.state = TaskState::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// Moves `Running → Completed`, attaching the scan results.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the task is running.
    pub fn complete(
        &mut self,
        documents: Vec<DocumentRecord>,
        stats: ScanStats,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_status(TaskStatus::Running, TaskStatus::Completed)?;
        self.state = TaskState::Completed {
            documents: Arc::from(documents),
            stats,
        };
        self.completed_at = Some(now);
        Ok(())
    }

    /// Moves `Running → Failed`, attaching the error message.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the task is running.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_status(TaskStatus::Running, TaskStatus::Failed)?;
        self.state = TaskState::Failed {
            error: error.into(),
        };
        self.completed_at = Some(now);
        Ok(())
    }

    fn ensure_status(&self, expected: TaskStatus, to: TaskStatus) -> Result<(), TransitionError> {
        let from = self.status();
        if from == expected {
            Ok(())
        } else {
            Err(TransitionError { from, to })
        }
    }

    /// The task identifier.
    #[inline]
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// The requested root folder.
    #[inline]
    #[must_use]
    pub fn folder_path(&self) -> &Utf8Path {
        &self.folder_path
    }

    /// The requested size cap in megabytes.
    #[inline]
    #[must_use]
    pub const fn max_file_size_mb(&self) -> u32 {
        self.max_file_size_mb
    }

    /// Current status.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// Current state, including the outcome once terminal.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &TaskState {
        &self.state
    }

    /// Returns `true` once the task has completed or failed.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// When the task was created.
    #[inline]
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When a runner picked the task up.
    #[inline]
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the task reached a terminal status.
    #[inline]
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Extracted documents, present only when completed.
    #[must_use]
    pub fn documents(&self) -> Option<&[DocumentRecord]> {
        match &self.state {
            TaskState::Completed { documents, .. } => Some(documents),
            _ => None,
        }
    }

    /// Pass statistics, present only when completed.
    #[must_use]
    pub const fn stats(&self) -> Option<&ScanStats> {
        match &self.state {
            TaskState::Completed { stats, .. } => Some(stats),
            _ => None,
        }
    }

    /// Failure message, present only when failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            TaskState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Number of extracted documents (zero unless completed).
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents().map_or(0, <[DocumentRecord]>::len)
    }

    /// Total words across extracted documents (zero unless completed).
    #[must_use]
    pub fn word_count(&self) -> u64 {
        self.documents()
            .map_or(0, |docs| docs.iter().map(DocumentRecord::word_count).sum())
    }

    /// Returns the lightweight listing view of this task.
    #[must_use]
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id,
            status: self.status(),
            folder_path: self.folder_path.clone(),
            document_count: self.document_count(),
            created_at: self.created_at,
        }
    }
}

/// Listing view of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub task_id: TaskId,
    /// Status at query time.
    pub status: TaskStatus,
    /// Requested root folder.
    pub folder_path: Utf8PathBuf,
    /// Extracted documents (zero unless completed).
    pub document_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Counters folded over every task in the store at query time.
///
/// Document and word totals only include completed tasks.
///
/// # Examples
///
/// ```
/// use dr_core::{AggregateStats, TaskId, TaskRecord};
/// use camino::Utf8PathBuf;
/// use chrono::Utc;
///
/// let pending = TaskRecord::new(TaskId::generate(), Utf8PathBuf::from("/a"), 50, Utc::now());
/// let stats = AggregateStats::from_records([&pending]);
/// assert_eq!(stats.total_tasks, 1);
/// assert_eq!(stats.completed_tasks, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Every task currently stored.
    pub total_tasks: usize,
    /// Tasks with status `Completed`.
    pub completed_tasks: usize,
    /// Tasks with status `Failed`.
    pub failed_tasks: usize,
    /// Documents across completed tasks.
    pub total_documents: usize,
    /// Words across completed tasks.
    pub total_words: u64,
}

impl AggregateStats {
    /// Folds the counters over `records`.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TaskRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, task| {
            acc.total_tasks += 1;
            match task.status() {
                TaskStatus::Completed => {
                    acc.completed_tasks += 1;
                    acc.total_documents += task.document_count();
                    acc.total_words += task.word_count();
                }
                TaskStatus::Failed => acc.failed_tasks += 1,
                TaskStatus::Pending | TaskStatus::Running => {}
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> TaskRecord {
        TaskRecord::new(TaskId::generate(), Utf8PathBuf::from("/data"), 50, Utc::now())
    }

    fn doc(name: &str, text: &str) -> DocumentRecord {
        DocumentRecord::new(
            Utf8PathBuf::from(format!("/data/{name}")),
            text.len() as u64,
            text.to_owned(),
            Some("utf-8"),
        )
    }

    #[test]
    fn test_new_task_is_pending_without_outcome() {
        let task = pending();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.documents().is_none());
        assert!(task.stats().is_none());
        assert!(task.error().is_none());
        assert!(task.completed_at().is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        assert_eq!(task.status(), TaskStatus::Running);
        assert!(task.started_at().is_some());

        let mut stats = ScanStats::new();
        stats.record_document();
        task.complete(vec![doc("a.txt", "one two")], stats, Utc::now())
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.document_count(), 1);
        assert_eq!(task.word_count(), 2);
        assert_eq!(task.stats().map(ScanStats::files_read), Some(1));
        assert!(task.error().is_none());
    }

    #[test]
    fn test_failure_sets_error_and_completed_at() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        task.fail("Folder path does not exist: /data", Utc::now())
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Failed);
        assert!(task.error().is_some_and(|e| e.contains("/data")));
        assert!(task.documents().is_none());
        assert!(task.completed_at().is_some());
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut task = pending();
        let err = task
            .complete(Vec::new(), ScanStats::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err.from, TaskStatus::Pending);
        assert_eq!(err.to, TaskStatus::Completed);
        assert!(task.fail("x", Utc::now()).is_err());
    }

    #[test]
    fn test_completed_at_set_once() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        task.complete(Vec::new(), ScanStats::new(), Utc::now())
            .unwrap();
        let first = task.completed_at();

        assert!(task.fail("late", Utc::now()).is_err());
        assert!(task.start(Utc::now()).is_err());
        assert_eq!(task.completed_at(), first);
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn test_serialized_shape_flattens_state() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        task.fail("boom", Utc::now()).unwrap();

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json.get("documents").is_none());
        assert!(json["completed_at"].is_string());
    }

    #[test]
    fn test_summary() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        task.complete(
            vec![doc("a.txt", "x"), doc("b.md", "y z")],
            ScanStats::new(),
            Utc::now(),
        )
        .unwrap();

        let summary = task.summary();
        assert_eq!(summary.task_id, task.task_id());
        assert_eq!(summary.status, TaskStatus::Completed);
        assert_eq!(summary.document_count, 2);
        assert_eq!(summary.folder_path.as_str(), "/data");
    }

    #[test]
    fn test_aggregate_stats_fold() {
        let mut completed = pending();
        completed.start(Utc::now()).unwrap();
        completed
            .complete(
                vec![doc("a.txt", "one two three"), doc("b.txt", "four")],
                ScanStats::new(),
                Utc::now(),
            )
            .unwrap();

        let mut failed = pending();
        failed.start(Utc::now()).unwrap();
        failed.fail("nope", Utc::now()).unwrap();

        let running = {
            let mut t = pending();
            t.start(Utc::now()).unwrap();
            t
        };

        let stats = AggregateStats::from_records([&completed, &failed, &running]);
        insta::assert_json_snapshot!(stats, @r#"
        {
          "total_tasks": 3,
          "completed_tasks": 1,
          "failed_tasks": 1,
          "total_documents": 2,
          "total_words": 4
        }
        "#);
    }

    #[test]
    fn test_task_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }
}
