//! Configuration structures for docreader.
//!
//! - [`ScanConfig`] - Scanner settings (encodings, size cap, extensions)
//! - [`TaskConfig`] - Task retention settings for the in-memory task store
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the keys it
//! overrides.

use std::ops::RangeInclusive;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Accepted range for a per-scan file size cap, in megabytes.
pub const MAX_FILE_SIZE_MB_RANGE: RangeInclusive<u32> = 1..=1000;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Configuration for the document scanner.
///
/// # Examples
///
/// ```
/// use dr_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.default_encoding, "utf-8");
/// assert_eq!(config.max_file_size_mb, 50);
/// assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Encoding tried first for plain-text files.
    pub default_encoding: String,

    /// Encodings tried, in order, after `default_encoding` fails.
    pub fallback_encodings: Vec<String>,

    /// Files larger than this many megabytes are skipped.
    pub max_file_size_mb: u32,

    /// Whether to follow symbolic links while walking.
    pub follow_links: bool,

    /// File extensions (without the dot, matched case-insensitively) to scan.
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_encoding: "utf-8".to_owned(),
            fallback_encodings: vec![
                "utf-8".to_owned(),
                "latin-1".to_owned(),
                "windows-1252".to_owned(),
            ],
            max_file_size_mb: 50,
            follow_links: false,
            extensions: vec!["txt".to_owned(), "md".to_owned(), "pdf".to_owned()],
        }
    }
}

impl ScanConfig {
    /// Returns the size cap in bytes.
    #[inline]
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        mb_to_bytes(self.max_file_size_mb)
    }

    /// Returns the full decode chain: the default encoding followed by the fallbacks.
    #[must_use]
    pub fn encoding_chain(&self) -> Vec<&str> {
        std::iter::once(self.default_encoding.as_str())
            .chain(self.fallback_encodings.iter().map(String::as_str))
            .collect()
    }
}

/// Converts a megabyte count to bytes.
///
/// # Examples
///
/// ```
/// assert_eq!(dr_core::config::mb_to_bytes(1), 1_048_576);
/// ```
#[inline]
#[must_use]
pub fn mb_to_bytes(mb: u32) -> u64 {
    u64::from(mb) * BYTES_PER_MB
}

/// Retention policy for the task store.
///
/// Only terminal tasks (completed or failed) are ever evicted. With both
/// fields unset the store grows without bound for the process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Seconds a terminal task is kept after it completed.
    pub retention_secs: Option<u64>,

    /// Maximum number of tasks kept; the oldest terminal tasks go first.
    pub max_tasks: Option<usize>,
}

/// Root configuration for docreader.
///
/// # Examples
///
/// ```
/// use dr_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"tasks": {"max_tasks": 100}}"#)?;
/// assert_eq!(config.tasks.max_tasks, Some(100));
/// assert_eq!(config.scan.max_file_size_mb, 50);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner configuration.
    pub scan: ScanConfig,

    /// Task store configuration.
    pub tasks: TaskConfig,
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::InvalidOption`] if a value is out of range.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_std_path()).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every option holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MAX_FILE_SIZE_MB_RANGE.contains(&self.scan.max_file_size_mb) {
            return Err(ConfigError::invalid_option(
                "scan.max_file_size_mb",
                format!(
                    "must be between {} and {}",
                    MAX_FILE_SIZE_MB_RANGE.start(),
                    MAX_FILE_SIZE_MB_RANGE.end()
                ),
            ));
        }
        if self.scan.default_encoding.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "scan.default_encoding",
                "must not be empty",
            ));
        }
        if self.scan.extensions.is_empty() {
            return Err(ConfigError::invalid_option(
                "scan.extensions",
                "at least one extension is required",
            ));
        }
        if self.tasks.max_tasks == Some(0) {
            return Err(ConfigError::invalid_option(
                "tasks.max_tasks",
                "must be positive",
            ));
        }
        Ok(())
    }
}
