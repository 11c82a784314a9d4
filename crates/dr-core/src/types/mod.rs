//! Domain types for docreader.
//!
//! # Module Organization
//!
//! - [`document`] - Extracted documents and word counting
//! - [`stats`] - Per-pass scan statistics
//! - [`status`] - Task lifecycle status
//! - [`task`] - Task records, summaries, and aggregate statistics
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use dr_core::{DocumentRecord, ScanStats, TaskRecord, TaskStatus};
//! ```

mod document;
mod stats;
mod status;
mod task;

pub use document::{count_words, DocumentRecord};
pub use stats::ScanStats;
pub use status::TaskStatus;
pub use task::{AggregateStats, TaskId, TaskRecord, TaskState, TaskSummary, TransitionError};
