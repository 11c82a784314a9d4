//! Summary statistics for one scan pass.

use serde::{Deserialize, Serialize};

/// Summary of one scan pass.
///
/// `error_count` always equals `errors.len()`: the only way to add an error
/// is [`record_error`](Self::record_error), and deserialization recomputes
/// the count from the message list.
///
/// # Examples
///
/// ```
/// use dr_core::ScanStats;
///
/// let mut stats = ScanStats::new();
/// stats.record_document();
/// stats.record_error("Error processing bad.txt: unable to decode");
///
/// assert_eq!(stats.files_read(), 1);
/// assert_eq!(stats.error_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScanStatsWire")]
pub struct ScanStats {
    files_read: u64,
    error_count: u64,
    errors: Vec<String>,
}

/// Deserialization shape; the error count is derived, never trusted.
#[derive(Deserialize)]
struct ScanStatsWire {
    #[serde(default)]
    files_read: u64,
    #[serde(default)]
    errors: Vec<String>,
}

impl From<ScanStatsWire> for ScanStats {
    fn from(wire: ScanStatsWire) -> Self {
        Self {
            files_read: wire.files_read,
            error_count: wire.errors.len() as u64,
            errors: wire.errors,
        }
    }
}

impl ScanStats {
    /// Creates empty statistics.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one produced document.
    #[inline]
    pub fn record_document(&mut self) {
        self.files_read += 1;
    }

    /// Records one non-fatal, per-file failure.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.error_count += 1;
    }

    /// Number of documents produced.
    #[inline]
    #[must_use]
    pub const fn files_read(&self) -> u64 {
        self.files_read
    }

    /// Number of per-file failures.
    #[inline]
    #[must_use]
    pub const fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Human-readable failure messages in scan order.
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns `true` if any file failed.
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stats_new() {
        let stats = ScanStats::new();
        assert_eq!(stats.files_read(), 0);
        assert_eq!(stats.error_count(), 0);
        assert!(!stats.has_errors());
    }

    #[test]
    fn test_error_count_tracks_errors() {
        let mut stats = ScanStats::new();
        stats.record_error("first");
        stats.record_error("second");
        assert_eq!(stats.error_count(), 2);
        assert_eq!(stats.errors(), ["first", "second"]);
    }

    #[test]
    fn test_scan_stats_snapshot() {
        let mut stats = ScanStats::new();
        stats.record_document();
        stats.record_document();
        stats.record_error("Error processing a.txt: boom");

        insta::assert_json_snapshot!(stats, @r#"
        {
          "files_read": 2,
          "error_count": 1,
          "errors": [
            "Error processing a.txt: boom"
          ]
        }
        "#);
    }

    #[test]
    fn test_deserialize_recomputes_count() {
        let json = r#"{"files_read": 3, "error_count": 99, "errors": ["x"]}"#;
        let stats: ScanStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.files_read(), 3);
        assert_eq!(stats.error_count(), 1);
    }
}
