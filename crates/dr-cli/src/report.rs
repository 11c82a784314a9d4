//! Batch report over several folders.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use dr_core::DocumentRecord;
use dr_scanner::ScanError;
use serde::Serialize;

/// One document line in a folder report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub words: u64,
    pub size_kb: f64,
}

/// Per-folder results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderReport {
    pub document_count: usize,
    pub total_words: u64,
    pub documents: Vec<DocumentEntry>,
}

/// A folder whose scan failed fatally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFolder {
    pub path: Utf8PathBuf,
    pub error: String,
}

/// Totals across every requested folder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    pub total_folders: usize,
    pub total_documents: usize,
    pub total_words: u64,
    pub failed_folders: Vec<FailedFolder>,
}

/// The full batch report written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub timestamp: DateTime<Local>,
    pub folders: BTreeMap<String, FolderReport>,
    pub summary: ReportSummary,
}

impl BatchReport {
    /// Starts an empty report for `total_folders` requested folders.
    pub fn new(timestamp: DateTime<Local>, total_folders: usize) -> Self {
        Self {
            timestamp,
            folders: BTreeMap::new(),
            summary: ReportSummary {
                total_folders,
                ..ReportSummary::default()
            },
        }
    }

    /// Adds the outcome of scanning one folder.
    pub fn record(&mut self, path: Utf8PathBuf, result: Result<Vec<DocumentRecord>, ScanError>) {
        match result {
            Ok(documents) => {
                let folder = FolderReport::from_documents(&documents);
                self.summary.total_documents += folder.document_count;
                self.summary.total_words += folder.total_words;
                self.folders.insert(path.into_string(), folder);
            }
            Err(e) => self.summary.failed_folders.push(FailedFolder {
                path,
                error: e.to_string(),
            }),
        }
    }
}

impl FolderReport {
    fn from_documents(documents: &[DocumentRecord]) -> Self {
        let documents: Vec<DocumentEntry> = documents
            .iter()
            .map(|doc| DocumentEntry {
                name: doc.filename().to_owned(),
                words: doc.word_count(),
                size_kb: size_kb(doc.size_bytes()),
            })
            .collect();
        Self {
            document_count: documents.len(),
            total_words: documents.iter().map(|d| d.words).sum(),
            documents,
        }
    }
}

/// Bytes to kilobytes, rounded to two decimals.
#[allow(clippy::cast_precision_loss)] // Display only
pub fn size_kb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}
