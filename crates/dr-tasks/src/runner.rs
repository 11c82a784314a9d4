//! Background execution of one scan task.
//!
//! A [`TaskRunner`] owns exactly one `Pending` task. It moves the task to
//! `Running`, performs the scan on Tokio's blocking pool, and records exactly
//! one terminal transition whatever happens: success, scan error, panic, or
//! cancellation. A spawned runner whose future is dropped before it finishes
//! (for example because the runtime shut down) fails its task on drop.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────── Async Runtime (tokio) ─────────────────┐
//! │  TaskRunner::run                                                     │
//! │    1. store.mark_running                                             │
//! │    2. spawn_blocking ──────────┐                                     │
//! │    4. mark_completed /         │                                     │
//! │       mark_failed  ◄───────────┼── JoinHandle (Ok / Err / panic)     │
//! └────────────────────────────────┼─────────────────────────────────────┘
//!                                  ▼
//! ┌──────────────────────── Blocking Thread (spawn_blocking) ────────────┐
//! │    3. DocumentScanner::scan_with_cancel (rayon inside)               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use camino::Utf8PathBuf;
use dr_core::{FxHashMap, TaskId, TaskStatus};
use dr_scanner::DocumentScanner;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::TaskError;
use crate::store::TaskStore;

/// Error recorded when the scan panics.
pub const PANIC_MESSAGE: &str = "scan task panicked";

/// Error recorded when the runner is dropped or aborted before finishing.
pub const ABORTED_MESSAGE: &str = "scan task was aborted";

/// Cancellation tokens of runners that have not finished yet.
#[derive(Debug, Clone, Default)]
pub struct ActiveRunners {
    tokens: Arc<Mutex<FxHashMap<TaskId, CancellationToken>>>,
}

impl ActiveRunners {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, task_id: TaskId, token: CancellationToken) {
        self.tokens.lock().insert(task_id, token);
    }

    fn remove(&self, task_id: TaskId) {
        self.tokens.lock().remove(&task_id);
    }

    /// Signals the runner for `task_id`. Returns `false` if it already finished.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        match self.tokens.lock().get(&task_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of runners still in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Returns `true` if no runner is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

/// Drives one task from `Pending` to a terminal status.
#[derive(Debug)]
pub struct TaskRunner {
    store: Arc<TaskStore>,
    scanner: DocumentScanner,
    task_id: TaskId,
    folder_path: Utf8PathBuf,
    max_file_size_bytes: u64,
    cancel: CancellationToken,
    active: Option<ActiveRunners>,
}

impl TaskRunner {
    /// Creates a runner for a task already `Pending` in `store`.
    #[must_use]
    pub fn new(
        store: Arc<TaskStore>,
        scanner: DocumentScanner,
        task_id: TaskId,
        folder_path: Utf8PathBuf,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            store,
            scanner,
            task_id,
            folder_path,
            max_file_size_bytes,
            cancel: CancellationToken::new(),
            active: None,
        }
    }

    /// Registers this runner so it can be cancelled through `active`.
    ///
    /// The entry is removed once the runner records a terminal status.
    #[must_use]
    pub fn with_registry(mut self, active: ActiveRunners) -> Self {
        active.register(self.task_id, self.cancel.clone());
        self.active = Some(active);
        self
    }

    /// Spawns the runner on `runtime` without waiting for it.
    ///
    /// If the runtime drops the runner before it records an outcome, the
    /// task is failed with [`ABORTED_MESSAGE`] instead of staying live.
    pub fn spawn(self, runtime: &Handle) -> JoinHandle<Result<TaskStatus, TaskError>> {
        let guard = AbandonGuard {
            store: Arc::clone(&self.store),
            task_id: self.task_id,
            active: self.active.clone(),
            armed: true,
        };
        runtime.spawn(async move {
            let result = self.run().await;
            guard.disarm();
            result
        })
    }

    /// Runs the task to a terminal status and returns that status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the task was missing or not `Pending`; the
    /// store is left untouched in that case.
    pub async fn run(self) -> Result<TaskStatus, TaskError> {
        let Self {
            store,
            scanner,
            task_id,
            folder_path,
            max_file_size_bytes,
            cancel,
            active,
        } = self;

        let started = store.mark_running(task_id);
        if let Err(e) = started {
            warn!(task_id = %task_id, error = %e, "Task could not be started");
            if let Some(active) = &active {
                active.remove(task_id);
            }
            return Err(e);
        }
        info!(task_id = %task_id, folder = %folder_path, "Task running");

        let scan_path = folder_path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            scanner.scan_with_cancel(&scan_path, max_file_size_bytes, &cancel)
        })
        .await;

        let recorded = match joined {
            Ok(Ok(outcome)) => {
                info!(
                    task_id = %task_id,
                    documents = outcome.documents.len(),
                    errors = outcome.stats.error_count(),
                    "Task completed"
                );
                store
                    .mark_completed(task_id, outcome.documents, outcome.stats)
                    .map(|()| TaskStatus::Completed)
            }
            Ok(Err(e)) => {
                error!(task_id = %task_id, folder = %folder_path, error = %e, "Task failed");
                store
                    .mark_failed(task_id, e.to_string())
                    .map(|()| TaskStatus::Failed)
            }
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    PANIC_MESSAGE
                } else {
                    ABORTED_MESSAGE
                };
                error!(task_id = %task_id, folder = %folder_path, "{message}");
                store
                    .mark_failed(task_id, message)
                    .map(|()| TaskStatus::Failed)
            }
        };

        if let Some(active) = &active {
            active.remove(task_id);
        }
        recorded
    }
}

/// Fails the task if a spawned runner is dropped before it finishes.
struct AbandonGuard {
    store: Arc<TaskStore>,
    task_id: TaskId,
    active: Option<ActiveRunners>,
    armed: bool,
}

impl AbandonGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(active) = &self.active {
            active.remove(self.task_id);
        }
        match self.store.mark_abandoned(self.task_id, ABORTED_MESSAGE) {
            Ok(true) => error!(task_id = %self.task_id, "Runner dropped before finishing"),
            Ok(false) => {}
            Err(e) => warn!(task_id = %self.task_id, error = %e, "Abandoned task vanished"),
        }
    }
}
