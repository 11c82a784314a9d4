//! Built-in PDF backend using `lopdf`.

use std::sync::Arc;

use camino::Utf8Path;
use tracing::trace;

use crate::error::ExtractError;
use crate::extract::PdfExtractor;

/// Extracts page text with `lopdf`, concatenating pages in page order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, path: &Utf8Path) -> Result<String, ExtractError> {
        let document = lopdf::Document::load(path.as_std_path())
            .map_err(|e| ExtractError::extraction(path, e.to_string()))?;

        let mut text = String::new();
        // `get_pages` is keyed by 1-based page number, so iteration is page order
        for page_number in document.get_pages().into_keys() {
            let page_text = document
                .extract_text(&[page_number])
                .map_err(|e| ExtractError::extraction(path, format!("page {page_number}: {e}")))?;
            trace!(path = %path, page = page_number, chars = page_text.len(), "Extracted PDF page");
            text.push_str(&page_text);
        }

        Ok(text)
    }
}

impl LopdfExtractor {
    /// Returns this backend as a shareable trait object.
    #[must_use]
    pub fn shared() -> Arc<dyn PdfExtractor> {
        Arc::new(Self)
    }
}
