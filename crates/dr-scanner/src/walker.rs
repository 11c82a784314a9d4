//! Directory traversal for supported document files.
//!
//! [`FileWalker`] uses the `ignore` crate with every standard filter turned
//! off: hidden files and files matched by `.gitignore` are documents too.
//! Entries are sorted by file name so a pass over an unchanged tree always
//! yields the same order.

use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use dr_core::FxHashSet;
use ignore::WalkBuilder;
use tracing::warn;

use crate::error::ScanError;

/// A file whose extension matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkedFile {
    /// A path usable as UTF-8.
    Utf8(Utf8PathBuf),
    /// A path with bytes that are not UTF-8. The scanner reports it per file.
    NonUtf8(PathBuf),
}

/// Discovers files with a configured set of extensions below a root.
///
/// # Examples
///
/// ```no_run
/// use dr_scanner::FileWalker;
/// use camino::Utf8Path;
///
/// let walker = FileWalker::new(Utf8Path::new("/data/docs"), ["txt", "md", "pdf"]);
/// for file in walker.collect_paths()? {
///     println!("{file:?}");
/// }
/// # Ok::<(), dr_scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Lowercased extensions to keep, without the leading dot.
    extensions: FxHashSet<String>,
    /// Whether to follow symbolic links.
    follow_links: bool,
}

impl FileWalker {
    /// Creates a walker for `root` that keeps files with the given extensions.
    ///
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn new<I, S>(root: &Utf8Path, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            root: root.to_owned(),
            extensions,
            follow_links: false,
        }
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Collects every matching regular file below the root, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Walk`] if any directory cannot be enumerated.
    pub fn collect_paths(&self) -> Result<Vec<WalkedFile>, ScanError> {
        let mut files = Vec::new();

        for result in self.build_walker() {
            let entry = result?;

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.matches_extension(path) {
                continue;
            }

            files.push(match Utf8Path::from_path(path) {
                Some(utf8_path) => WalkedFile::Utf8(utf8_path.to_owned()),
                None => {
                    warn!(path = %path.display(), "Matching file has a non-UTF-8 path");
                    WalkedFile::NonUtf8(path.to_owned())
                }
            });
        }

        Ok(files)
    }

    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
