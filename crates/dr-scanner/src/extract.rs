//! Text extraction for plain-text and PDF files.
//!
//! [`Extractor`] dispatches on [`DocumentKind`]:
//!
//! - Plain text and Markdown go through a [`TextDecoder`], which tries each
//!   configured encoding in order and keeps the first strict success.
//! - PDFs go through an injected [`PdfExtractor`]. A scanner built without
//!   one reports every PDF as [`ExtractError::PdfUnavailable`].

use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use camino::Utf8Path;
use encoding_rs::Encoding;
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use crate::error::ExtractError;

/// The format family of a discovered file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// `.txt` and any other configured extension without a dedicated reader.
    PlainText,
    /// `.md` / `.markdown`, read as raw text with markup intact.
    Markdown,
    /// `.pdf`, read page by page.
    Pdf,
}

impl DocumentKind {
    /// Classifies `path` by its extension, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use dr_scanner::DocumentKind;
    /// use camino::Utf8Path;
    ///
    /// assert_eq!(DocumentKind::from_path(Utf8Path::new("a/REPORT.PDF")), DocumentKind::Pdf);
    /// assert_eq!(DocumentKind::from_path(Utf8Path::new("notes.md")), DocumentKind::Markdown);
    /// assert_eq!(DocumentKind::from_path(Utf8Path::new("plain.txt")), DocumentKind::PlainText);
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            Some(ext) if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") => {
                Self::Markdown
            }
            _ => Self::PlainText,
        }
    }

    /// Returns `true` for kinds decoded through the encoding chain.
    #[inline]
    #[must_use]
    pub const fn is_plain_text(self) -> bool {
        matches!(self, Self::PlainText | Self::Markdown)
    }
}

/// One step of the decode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    /// Strict UTF-8.
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    /// Any other WHATWG encoding, decoded without replacement characters.
    Whatwg(&'static Encoding),
}

impl Decoding {
    /// Resolves a user-facing encoding label.
    ///
    /// The WHATWG registry maps `latin-1` and friends to windows-1252, which
    /// leaves five bytes undefined; those labels get a true ISO-8859-1 step.
    fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "latin-1" | "latin1" | "latin_1" | "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "l1" => {
                Some(Self::Latin1)
            }
            _ => Encoding::for_label(normalized.as_bytes()).map(|encoding| {
                if encoding == encoding_rs::UTF_8 {
                    Self::Utf8
                } else {
                    Self::Whatwg(encoding)
                }
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Whatwg(encoding) => encoding.name(),
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(ToOwned::to_owned),
            Self::Latin1 => Some(bytes.iter().copied().map(char::from).collect()),
            Self::Whatwg(encoding) => {
                let (encoding, body) = sniff_utf16_bom(encoding, bytes);
                encoding
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(Cow::into_owned)
            }
        }
    }
}

/// A UTF-16 step honours a leading byte order mark, which picks the
/// endianness and is not part of the text.
fn sniff_utf16_bom<'a>(
    encoding: &'static Encoding,
    bytes: &'a [u8],
) -> (&'static Encoding, &'a [u8]) {
    let is_utf16 = |e: &'static Encoding| e == encoding_rs::UTF_16LE || e == encoding_rs::UTF_16BE;
    match Encoding::for_bom(bytes) {
        Some((bom, len)) if is_utf16(encoding) && is_utf16(bom) => (bom, &bytes[len..]),
        _ => (encoding, bytes),
    }
}

/// Decodes raw bytes by trying an ordered chain of encodings.
///
/// Unknown labels are dropped when the chain is built; repeated labels are
/// tried once. The first encoding that decodes the whole input without
/// error wins.
///
/// # Examples
///
/// ```
/// use dr_scanner::TextDecoder;
///
/// let decoder = TextDecoder::new(["utf-8", "windows-1252"]);
/// let (text, encoding) = decoder.decode(b"caf\xe9").unwrap();
/// assert_eq!(text, "café");
/// assert_eq!(encoding, "windows-1252");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDecoder {
    chain: SmallVec<[Decoding; 4]>,
}

impl TextDecoder {
    /// Builds a decoder from encoding labels, in priority order.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chain: SmallVec<[Decoding; 4]> = SmallVec::new();
        for label in labels {
            let label = label.as_ref();
            match Decoding::from_label(label) {
                Some(decoding) if !chain.contains(&decoding) => chain.push(decoding),
                Some(_) => {}
                None => debug!(label, "Ignoring unknown encoding label"),
            }
        }
        Self { chain }
    }

    /// Returns the canonical names of the encodings that will be tried.
    #[must_use]
    pub fn encodings(&self) -> Vec<&'static str> {
        self.chain.iter().map(|decoding| decoding.name()).collect()
    }

    /// Returns `true` if no usable encoding was configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Decodes `bytes` with the first encoding that accepts them, returning
    /// the text and the name of that encoding.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> Option<(String, &'static str)> {
        self.chain.iter().find_map(|decoding| {
            let text = decoding.decode(bytes);
            if text.is_none() {
                trace!(encoding = decoding.name(), "Decode attempt failed");
            }
            text.map(|text| (text, decoding.name()))
        })
    }
}

/// A pluggable PDF text extractor.
///
/// Implementations concatenate page text in page order and release the
/// document before returning, on success or failure.
pub trait PdfExtractor: Send + Sync + fmt::Debug {
    /// Extracts the text of every page of the PDF at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Extraction`] if the document cannot be opened
    /// or a page cannot be read.
    fn extract(&self, path: &Utf8Path) -> Result<String, ExtractError>;
}

/// Text pulled out of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// The extracted text.
    pub text: String,
    /// The encoding that decoded a plain-text file; `None` for PDFs.
    pub encoding: Option<&'static str>,
}

/// Reads one file and returns its text according to its [`DocumentKind`].
#[derive(Debug, Clone)]
pub struct Extractor {
    decoder: TextDecoder,
    pdf: Option<Arc<dyn PdfExtractor>>,
}

impl Extractor {
    /// Creates an extractor from a decode chain and an optional PDF backend.
    #[must_use]
    pub fn new(decoder: TextDecoder, pdf: Option<Arc<dyn PdfExtractor>>) -> Self {
        Self { decoder, pdf }
    }

    /// Returns `true` if PDFs can be read.
    #[inline]
    #[must_use]
    pub fn supports_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    /// Extracts the text of the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Read`] if the file cannot be read
    /// - [`ExtractError::Decode`] if no encoding in the chain accepts the bytes
    /// - [`ExtractError::PdfUnavailable`] for a PDF when no backend is installed
    /// - [`ExtractError::Extraction`] if the PDF backend fails or panics
    pub fn extract(&self, path: &Utf8Path) -> Result<Extracted, ExtractError> {
        match DocumentKind::from_path(path) {
            DocumentKind::Pdf => {
                let pdf = self
                    .pdf
                    .as_ref()
                    .ok_or_else(|| ExtractError::pdf_unavailable(path))?;
                // Malformed documents can make a backend panic
                let text = panic::catch_unwind(AssertUnwindSafe(|| pdf.extract(path)))
                    .unwrap_or_else(|_| {
                        error!(path = %path, "PDF backend panicked");
                        Err(ExtractError::extraction(path, "PDF backend panicked"))
                    })?;
                Ok(Extracted {
                    text,
                    encoding: None,
                })
            }
            DocumentKind::PlainText | DocumentKind::Markdown => {
                let bytes = std::fs::read(path).map_err(|e| ExtractError::read(path, e))?;
                let (text, encoding) =
                    self.decoder
                        .decode(&bytes)
                        .ok_or_else(|| ExtractError::Decode {
                            path: path.to_owned(),
                            tried: self.decoder.encodings().join(", "),
                        })?;
                Ok(Extracted {
                    text,
                    encoding: Some(encoding),
                })
            }
        }
    }
}
