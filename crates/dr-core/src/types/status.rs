//! Task lifecycle status.
//!
//! This module provides the [`TaskStatus`] enum for tracking where a scan
//! task is in its lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lifecycle status of a scan task.
///
/// Transitions only move forward: `Pending → Running → {Completed | Failed}`.
///
/// # Examples
///
/// ```
/// use dr_core::TaskStatus;
///
/// assert!(!TaskStatus::Running.is_terminal());
/// assert!(TaskStatus::Failed.is_terminal());
/// assert_eq!("completed".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up by a runner.
    #[default]
    Pending,

    /// A runner is scanning the folder.
    Running,

    /// The scan finished; documents and stats are available.
    Completed,

    /// The scan aborted; an error message is available.
    Failed,
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Running, Self::Completed, Self::Failed];

    /// Returns `true` for `Completed` and `Failed`; no transition leaves these.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the lowercase wire name of this status.
    ///
    /// # Examples
    ///
    /// ```
    /// use dr_core::TaskStatus;
    ///
    /// assert_eq!(TaskStatus::Pending.label(), "pending");
    /// ```
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task status '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_task_status_default() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn test_task_status_parse() {
        assert_eq!("RUNNING".parse::<TaskStatus>(), Ok(TaskStatus::Running));
        assert_eq!(" failed ".parse::<TaskStatus>(), Ok(TaskStatus::Failed));
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            r#""completed""#
        );
        let status: TaskStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(status, TaskStatus::Pending);
    }
}
