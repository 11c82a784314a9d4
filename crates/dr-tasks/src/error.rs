//! Error types for the dr-tasks crate.
//!
//! [`TaskError`] covers everything the task layer can report to a caller:
//! unknown task IDs, rejected requests, lifecycle violations, and scan
//! failures surfaced by the synchronous entry point.

use dr_core::{TaskId, TransitionError};
use dr_scanner::ScanError;

/// Errors returned by the task store and scan service.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No task with this ID is stored (never created, or evicted).
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// The request failed validation before a task was created.
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    /// A status change that the task lifecycle forbids.
    #[error("task {task_id}: {source}")]
    IllegalTransition {
        /// The task being updated.
        task_id: TaskId,
        /// The rejected transition.
        #[source]
        source: TransitionError,
    },

    /// The service was created outside a Tokio runtime.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A synchronous scan failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl TaskError {
    /// Creates a new [`TaskError::InvalidRequest`] error.
    #[inline]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    /// Creates a new [`TaskError::IllegalTransition`] error.
    #[inline]
    pub const fn illegal_transition(task_id: TaskId, source: TransitionError) -> Self {
        Self::IllegalTransition { task_id, source }
    }

    /// Returns `true` if the error means the task ID is unknown.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for errors caused by the caller's input rather than
    /// by the system.
    #[inline]
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidRequest(_))
    }
}
