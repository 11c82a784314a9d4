//! Live progress counters for a scan pass.
//!
//! [`ScanProgress`] is updated from rayon workers while a pass runs and can
//! be read from any thread. All counters use relaxed atomics: they are for
//! display and never drive control flow.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters describing the pass in flight (or the last one).
///
/// # Examples
///
/// ```
/// use dr_scanner::ScanProgress;
///
/// let progress = ScanProgress::new();
/// progress.set_discovered(3);
/// progress.increment_read();
/// progress.increment_skipped();
///
/// let snap = progress.snapshot();
/// assert_eq!(snap.processed(), 2);
/// assert_eq!(snap.remaining(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ScanProgress {
    /// Candidate files found by the walker.
    discovered: AtomicU64,
    /// Files turned into documents.
    read: AtomicU64,
    /// Files that failed extraction.
    errors: AtomicU64,
    /// Files over the size cap.
    skipped: AtomicU64,
}

impl ScanProgress {
    /// Creates counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records how many candidate files the walker found.
    #[inline]
    pub fn set_discovered(&self, count: u64) {
        self.discovered.store(count, Ordering::Relaxed);
    }

    /// Counts one produced document.
    #[inline]
    pub fn increment_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one per-file failure.
    #[inline]
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one file skipped for size.
    #[inline]
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            discovered: self.discovered.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero at the start of a pass.
    pub fn reset(&self) {
        self.discovered.store(0, Ordering::Relaxed);
        self.read.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}

/// A copy of [`ScanProgress`] that can be stored or serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Candidate files found by the walker.
    pub discovered: u64,
    /// Files turned into documents.
    pub read: u64,
    /// Files that failed extraction.
    pub errors: u64,
    /// Files over the size cap.
    pub skipped: u64,
}

impl ProgressSnapshot {
    /// Files handled so far, whatever the outcome.
    #[inline]
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.read + self.errors + self.skipped
    }

    /// Files not yet handled.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.discovered.saturating_sub(self.processed())
    }

    /// Completion as a percentage; 100 when nothing was discovered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Display only
    pub fn percent_complete(&self) -> f64 {
        if self.discovered == 0 {
            return 100.0;
        }
        (self.processed() as f64 / self.discovered as f64) * 100.0
    }
}
