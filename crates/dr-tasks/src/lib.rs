//! Asynchronous scan tasks for docreader.
//!
//! This crate turns a blocking folder scan into a pollable task:
//!
//! - [`TaskStore`]: concurrent map of task records with retention
//! - [`TaskRunner`]: drives one task through `Pending → Running → terminal`
//!   on Tokio's blocking pool
//! - [`ScanService`]: submit, query, list, aggregate, wait, and cancel
//!
//! # Example
//!
//! ```no_run
//! use dr_core::{Config, TaskStatus};
//! use dr_scanner::PdfSupport;
//! use dr_tasks::{ScanRequest, ScanService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dr_tasks::TaskError> {
//!     let service = ScanService::new(&Config::default(), PdfSupport::detect())?;
//!     let task = service.submit_scan(ScanRequest::new("/data/docs").with_max_file_size_mb(10))?;
//!
//!     // Poll from anywhere; readers never see a half-written record
//!     let snapshot = service.get_task(task.task_id())?;
//!     assert!(matches!(snapshot.status(), TaskStatus::Pending | TaskStatus::Running | TaskStatus::Completed | TaskStatus::Failed));
//!
//!     let done = service.wait_for_task(task.task_id()).await?;
//!     println!("{}", done.status());
//!     println!("{:?}", service.aggregate_stats());
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod runner;
mod service;
mod store;

pub use error::TaskError;
pub use runner::{ActiveRunners, TaskRunner, ABORTED_MESSAGE, PANIC_MESSAGE};
pub use service::{ScanRequest, ScanService};
pub use store::TaskStore;
