//! Extracted document records.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Counts maximal runs of non-whitespace characters in `text`.
///
/// This is plain whitespace tokenization, not locale-aware word segmentation.
///
/// # Examples
///
/// ```
/// use dr_core::count_words;
///
/// assert_eq!(count_words("a  b\tc\n"), 3);
/// assert_eq!(count_words("   "), 0);
/// ```
#[inline]
#[must_use]
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// The text extracted from one file, with its metadata.
///
/// Records are immutable once produced by the scanner; the word count is
/// derived from `text` at construction.
///
/// # Examples
///
/// ```
/// use dr_core::DocumentRecord;
/// use camino::Utf8PathBuf;
///
/// let doc = DocumentRecord::new(
///     Utf8PathBuf::from("/data/notes.txt"),
///     12,
///     "hello world".to_owned(),
///     Some("utf-8"),
/// );
/// assert_eq!(doc.filename(), "notes.txt");
/// assert_eq!(doc.word_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    filename: String,
    path: Utf8PathBuf,
    size_bytes: u64,
    text: String,
    word_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
}

impl DocumentRecord {
    /// Creates a record for the file at `path`.
    ///
    /// `encoding` names the text encoding that decoded the file, or `None`
    /// for formats that are not byte-decoded (PDF).
    #[must_use]
    pub fn new(path: Utf8PathBuf, size_bytes: u64, text: String, encoding: Option<&str>) -> Self {
        let filename = path.file_name().unwrap_or(path.as_str()).to_owned();
        let word_count = count_words(&text);
        Self {
            filename,
            path,
            size_bytes,
            text,
            word_count,
            encoding: encoding.map(ToOwned::to_owned),
        }
    }

    /// The file name without its directory.
    #[inline]
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The resolved full path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// File size on disk.
    #[inline]
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// The extracted text, possibly empty.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whitespace-delimited token count of [`text`](Self::text).
    #[inline]
    #[must_use]
    pub const fn word_count(&self) -> u64 {
        self.word_count
    }

    /// The encoding that decoded a plain-text file.
    #[inline]
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Returns at most `max_chars` characters of the text, for previews.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}
