//! Recursive document discovery and text extraction.
//!
//! This crate walks a folder tree, picks out `.txt`, `.md`, and `.pdf` files,
//! extracts their text, and reports a document list with pass statistics.
//!
//! # Overview
//!
//! The main entry point is [`DocumentScanner`], which combines:
//!
//! - [`FileWalker`]: recursive traversal with the `ignore` crate
//! - [`Extractor`]: encoding-fallback decoding and pluggable PDF extraction
//! - [`ScanProgress`]: atomic counters readable while a pass runs
//!
//! # Example
//!
//! ```no_run
//! use dr_core::ScanConfig;
//! use dr_scanner::{DocumentScanner, PdfSupport};
//! use camino::Utf8Path;
//!
//! let config = ScanConfig::default();
//! let max_bytes = config.max_file_size_bytes();
//! let scanner = DocumentScanner::new(config, PdfSupport::detect());
//!
//! let outcome = scanner.scan(Utf8Path::new("/data/docs"), max_bytes)?;
//! for doc in &outcome.documents {
//!     println!("{}: {} words", doc.filename(), doc.word_count());
//! }
//! # Ok::<(), dr_scanner::ScanError>(())
//! ```
//!
//! # Failure model
//!
//! A bad root, an unreadable directory, or cancellation aborts the pass with
//! a [`ScanError`]. Anything that goes wrong with a single file becomes a
//! message in [`ScanStats::errors`](dr_core::ScanStats::errors) and the pass
//! continues. Files over the size cap are skipped without an error entry.
//!
//! # Architecture
//!
//! ```text
//! DocumentScanner
//!     │
//!     ├── FileWalker (collect paths, sorted)
//!     │       └── WalkBuilder (ignore crate)
//!     │
//!     ├── Extractor (rayon, order-preserving)
//!     │       ├── TextDecoder (encoding_rs)
//!     │       └── PdfExtractor (lopdf, optional)
//!     │
//!     └── ScanProgress (atomic counters)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod extract;
#[cfg(feature = "pdf")]
mod pdf;
mod stats;
mod walker;

pub use error::{ExtractError, ScanError};
pub use extract::{DocumentKind, Extracted, Extractor, PdfExtractor, TextDecoder};
#[cfg(feature = "pdf")]
pub use pdf::LopdfExtractor;
pub use stats::{ProgressSnapshot, ScanProgress};
pub use walker::{FileWalker, WalkedFile};

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dr_core::{DocumentRecord, ScanConfig, ScanStats};
use parking_lot::Mutex;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Selects the PDF backend compiled into this build.
#[derive(Debug, Clone, Copy)]
pub struct PdfSupport;

impl PdfSupport {
    /// Returns the built-in PDF extractor, or `None` when the `pdf` feature
    /// is disabled.
    #[must_use]
    pub fn detect() -> Option<Arc<dyn PdfExtractor>> {
        #[cfg(feature = "pdf")]
        {
            Some(LopdfExtractor::shared())
        }
        #[cfg(not(feature = "pdf"))]
        {
            None
        }
    }
}

/// Result of one successful scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Documents in enumeration order.
    pub documents: Vec<DocumentRecord>,
    /// Files read and per-file failures.
    pub stats: ScanStats,
    /// Files left out for exceeding the size cap.
    pub skipped: u64,
}

/// What happened to one discovered file.
enum FileOutcome {
    Document(DocumentRecord),
    Skipped,
    Failed(ExtractError),
    Cancelled,
}

/// Scans folders for documents and extracts their text.
///
/// `DocumentScanner` is cheaply cloneable. Clones share the progress
/// counters and last-pass statistics, so a handle kept by a caller can
/// observe a pass running on another thread.
///
/// Passes on separate scanners are fully independent. Passes run
/// concurrently on the same scanner each return correct results, but
/// [`last_stats`](Self::last_stats) and [`progress`](Self::progress) then
/// reflect whichever pass wrote last.
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    /// Scanner configuration.
    config: ScanConfig,
    /// Per-file text extraction.
    extractor: Extractor,
    /// Live counters for the pass in flight.
    progress: Arc<ScanProgress>,
    /// Statistics of the most recent pass.
    last_stats: Arc<Mutex<ScanStats>>,
}

impl DocumentScanner {
    /// Creates a scanner with the given configuration and PDF backend.
    ///
    /// Pass [`PdfSupport::detect()`] for the built-in backend or `None` to
    /// report every PDF as unsupported.
    #[must_use]
    pub fn new(config: ScanConfig, pdf: Option<Arc<dyn PdfExtractor>>) -> Self {
        let decoder = TextDecoder::new(config.encoding_chain());
        debug!(
            encodings = ?decoder.encodings(),
            pdf = pdf.is_some(),
            "Creating document scanner"
        );
        Self {
            config,
            extractor: Extractor::new(decoder, pdf),
            progress: Arc::new(ScanProgress::new()),
            last_stats: Arc::new(Mutex::new(ScanStats::new())),
        }
    }

    /// Scans `root` recursively, skipping files larger than
    /// `max_file_size_bytes`.
    ///
    /// # Errors
    ///
    /// - [`ScanError::PathNotFound`] / [`ScanError::NotADirectory`] for a bad root
    /// - [`ScanError::Permission`] if the root cannot be enumerated
    /// - [`ScanError::Walk`] if a directory below the root cannot be enumerated
    pub fn scan(
        &self,
        root: &Utf8Path,
        max_file_size_bytes: u64,
    ) -> Result<ScanOutcome, ScanError> {
        self.run_pass(root, max_file_size_bytes, None)
    }

    /// Like [`scan`](Self::scan), but checks `cancel` before each file.
    ///
    /// # Errors
    ///
    /// Everything [`scan`](Self::scan) returns, plus [`ScanError::Cancelled`]
    /// once the token fires.
    pub fn scan_with_cancel(
        &self,
        root: &Utf8Path,
        max_file_size_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        self.run_pass(root, max_file_size_bytes, Some(cancel))
    }

    fn run_pass(
        &self,
        root: &Utf8Path,
        max_file_size_bytes: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanOutcome, ScanError> {
        let root = resolve_root(root)?;
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(ScanError::Cancelled);
        }
        info!(root = %root, max_bytes = max_file_size_bytes, "Starting scan");

        self.progress.reset();
        *self.last_stats.lock() = ScanStats::new();

        let files = FileWalker::new(&root, &self.config.extensions)
            .with_follow_links(self.config.follow_links)
            .collect_paths()?;
        self.progress.set_discovered(files.len() as u64);
        info!(count = files.len(), "Collected document files");

        // Indexed parallel collect keeps enumeration order
        let outcomes: Vec<FileOutcome> = files
            .into_par_iter()
            .map(|file| match file {
                WalkedFile::Utf8(path) => self.process_file(&path, max_file_size_bytes, cancel),
                WalkedFile::NonUtf8(path) => {
                    self.progress.increment_errors();
                    FileOutcome::Failed(ExtractError::NonUtf8Path(path))
                }
            })
            .collect();

        let mut documents = Vec::with_capacity(outcomes.len());
        let mut stats = ScanStats::new();
        let mut skipped = 0_u64;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Document(doc) => {
                    stats.record_document();
                    documents.push(doc);
                }
                FileOutcome::Skipped => skipped += 1,
                FileOutcome::Failed(e) => {
                    let path = e.path();
                    warn!(path = %path.display(), error = %e, "Failed to extract file");
                    let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
                    stats.record_error(format!("Error processing {name}: {e}"));
                }
                FileOutcome::Cancelled => {
                    info!(root = %root, "Scan cancelled");
                    return Err(ScanError::Cancelled);
                }
            }
        }

        info!(
            files_read = stats.files_read(),
            errors = stats.error_count(),
            skipped,
            "Scan completed"
        );

        self.last_stats.lock().clone_from(&stats);

        Ok(ScanOutcome {
            documents,
            stats,
            skipped,
        })
    }

    fn process_file(
        &self,
        path: &Utf8Path,
        max_file_size_bytes: u64,
        cancel: Option<&CancellationToken>,
    ) -> FileOutcome {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return FileOutcome::Cancelled;
        }

        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                self.progress.increment_errors();
                return FileOutcome::Failed(ExtractError::read(path, e));
            }
        };

        if size > max_file_size_bytes {
            warn!(
                path = %path,
                size_bytes = size,
                max_bytes = max_file_size_bytes,
                "Skipping file over size limit"
            );
            self.progress.increment_skipped();
            return FileOutcome::Skipped;
        }

        match self.extractor.extract(path) {
            Ok(extracted) => {
                self.progress.increment_read();
                debug!(path = %path, encoding = ?extracted.encoding, "Extracted file");
                FileOutcome::Document(DocumentRecord::new(
                    path.to_owned(),
                    size,
                    extracted.text,
                    extracted.encoding,
                ))
            }
            Err(e) => {
                self.progress.increment_errors();
                FileOutcome::Failed(e)
            }
        }
    }

    /// Returns the statistics of the most recent completed pass.
    ///
    /// Empty before the first pass, and reset when a new pass starts.
    #[must_use]
    pub fn last_stats(&self) -> ScanStats {
        self.last_stats.lock().clone()
    }

    /// Returns the live counters of the current (or last) pass.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Returns `true` if this scanner can read PDFs.
    #[inline]
    #[must_use]
    pub fn supports_pdf(&self) -> bool {
        self.extractor.supports_pdf()
    }
}

/// Validates the root and returns its canonical, absolute form.
fn resolve_root(root: &Utf8Path) -> Result<Utf8PathBuf, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| ScanError::from_io(root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::not_a_directory(root));
    }
    // Probe enumeration up front so an unreadable root is a permission error
    std::fs::read_dir(root).map_err(|e| ScanError::from_io(root, e))?;
    root.canonicalize_utf8()
        .map_err(|e| ScanError::from_io(root, e))
}

/// Scans `path` with the default configuration and built-in PDF support.
///
/// # Errors
///
/// See [`DocumentScanner::scan`].
pub fn scan_folder(path: impl AsRef<Utf8Path>) -> Result<Vec<DocumentRecord>, ScanError> {
    let config = ScanConfig::default();
    let max_bytes = config.max_file_size_bytes();
    let scanner = DocumentScanner::new(config, PdfSupport::detect());
    scanner
        .scan(path.as_ref(), max_bytes)
        .map(|outcome| outcome.documents)
}
