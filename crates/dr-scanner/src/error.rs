//! Error types for the dr-scanner crate.
//!
//! Two error types split along the fatal/non-fatal line:
//!
//! - [`ScanError`]: the pass cannot proceed (bad root, unreadable directory,
//!   walk failure, cancellation). No partial document list is returned.
//! - [`ExtractError`]: one file failed. The scanner records the message in
//!   [`ScanStats`](dr_core::ScanStats) and moves on to the next file.
//!
//! # Examples
//!
//! ```
//! use dr_scanner::{ExtractError, ScanError};
//! use std::path::{Path, PathBuf};
//!
//! let err = ScanError::path_not_found("/missing");
//! assert!(err.is_path_error());
//!
//! let err = ExtractError::pdf_unavailable("/docs/report.pdf");
//! assert!(err.to_string().contains("PDF support unavailable"));
//! ```

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;

/// Fatal errors that abort a whole scan pass.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The root path does not exist.
    #[error("Folder path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The root path exists but is not a directory.
    #[error("Path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The root directory cannot be opened for enumeration.
    #[error("Permission denied accessing folder: {path}")]
    Permission {
        /// The directory that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure while resolving the root.
    #[error("failed to access folder {path}: {source}")]
    Io {
        /// The path being resolved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed below the root.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// The pass was cancelled between files.
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Creates a new [`ScanError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`ScanError::NotADirectory`] error.
    #[inline]
    pub fn not_a_directory(path: impl Into<Utf8PathBuf>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Classifies an I/O failure on `path` as a permission or generic error.
    pub fn from_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::Permission { path, source },
            std::io::ErrorKind::NotFound => Self::PathNotFound(path),
            _ => Self::Io { path, source },
        }
    }

    /// Returns `true` for root-path problems (missing, or not a directory).
    #[inline]
    #[must_use]
    pub const fn is_path_error(&self) -> bool {
        matches!(self, Self::PathNotFound(_) | Self::NotADirectory(_))
    }

    /// Returns `true` if the root or a directory below it could not be read
    /// for lack of permission.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Permission { .. } => true,
            Self::Walk(err) => err
                .io_error()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied),
            _ => false,
        }
    }
}

/// Non-fatal errors attributable to a single file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No encoding in the fallback chain decoded the file.
    #[error("Unable to decode {path} with any of: {tried}")]
    Decode {
        /// The undecodable file.
        path: Utf8PathBuf,
        /// Comma-separated encodings that were attempted.
        tried: String,
    },

    /// The PDF library failed to open or read the document.
    #[error("PDF extraction error for {path}: {message}")]
    Extraction {
        /// The PDF that failed.
        path: Utf8PathBuf,
        /// Library-provided failure description.
        message: String,
    },

    /// The scanner was built without a PDF extractor.
    #[error("PDF support unavailable for {0}")]
    PdfUnavailable(Utf8PathBuf),

    /// A matching file whose path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(PathBuf),
}

impl ExtractError {
    /// Creates a new [`ExtractError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ExtractError::Extraction`] error.
    #[inline]
    pub fn extraction(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new [`ExtractError::PdfUnavailable`] error.
    #[inline]
    pub fn pdf_unavailable(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PdfUnavailable(path.into())
    }

    /// Returns the file this error is attributed to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Decode { path, .. }
            | Self::Extraction { path, .. }
            | Self::PdfUnavailable(path) => path.as_std_path(),
            Self::NonUtf8Path(path) => path,
        }
    }
}
