//! Core types, errors, and configuration for docreader.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Configuration structures ([`Config`], [`ScanConfig`], [`TaskConfig`])
//! - Error types for configuration loading ([`ConfigError`])
//! - Domain types ([`DocumentRecord`], [`ScanStats`], [`TaskRecord`], [`TaskStatus`])
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! # Crate Dependencies
//!
//! ```text
//! dr-cli ──► dr-tasks ──► dr-scanner ──► dr-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{Config, ScanConfig, TaskConfig, MAX_FILE_SIZE_MB_RANGE};
pub use error::ConfigError;
pub use hash::{fx_hash_map, FxHashMap, FxHashSet};
pub use types::{
    count_words, AggregateStats, DocumentRecord, ScanStats, TaskId, TaskRecord, TaskState,
    TaskStatus, TaskSummary, TransitionError,
};
