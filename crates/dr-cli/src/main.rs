//! CLI entry point for the docreader tool.
//!
//! # Usage
//!
//! ```bash
//! docreader [OPTIONS] <COMMAND>
//!
//! # Scan one folder and print a summary per document
//! docreader scan ./docs
//!
//! # Scan several folders into a JSON report
//! docreader batch ./docs ./notes --output report.json
//!
//! # Run scans as background tasks and wait for them
//! docreader submit ./docs ./notes
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod report;

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use dr_core::{config::mb_to_bytes, Config, DocumentRecord, TaskStatus};
use dr_scanner::{DocumentScanner, PdfSupport};
use dr_tasks::{ScanRequest, ScanService};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::report::{size_kb, BatchReport};

/// Characters of text shown per document by `scan`.
const PREVIEW_CHARS: usize = 60;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Reads plain-text, Markdown and PDF documents from folders.
#[derive(Parser)]
#[command(name = "docreader", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Built-in defaults apply when omitted.
    #[arg(short, long, global = true, env = "DOCREADER_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan one folder and print each document found.
    Scan {
        /// Folder to scan recursively.
        path: Utf8PathBuf,

        /// Skip files larger than this many megabytes.
        #[arg(
            long,
            env = "DOCREADER_MAX_FILE_SIZE_MB",
            value_parser = clap::value_parser!(u32).range(1..=1000)
        )]
        max_file_size_mb: Option<u32>,

        /// Print documents as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Scan several folders and write a combined JSON report.
    Batch {
        /// Folders to scan.
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,

        /// Report file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// Skip files larger than this many megabytes.
        #[arg(
            long,
            env = "DOCREADER_MAX_FILE_SIZE_MB",
            value_parser = clap::value_parser!(u32).range(1..=1000)
        )]
        max_file_size_mb: Option<u32>,
    },

    /// Submit folders as background scan tasks and wait for all of them.
    Submit {
        /// Folders to scan.
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,

        /// Skip files larger than this many megabytes.
        #[arg(
            long,
            env = "DOCREADER_MAX_FILE_SIZE_MB",
            value_parser = clap::value_parser!(u32).range(1..=1000)
        )]
        max_file_size_mb: Option<u32>,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose` and
/// `warn` by default so command output stays readable. Logs go to stderr.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(format!("{level},lopdf=error"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file if one was given.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<Config> {
    match path {
        Some(path) => {
            info!(config = %path, "Loading configuration");
            Config::from_json_file(path)
                .wrap_err_with(|| format!("Failed to load configuration from {path}"))
        }
        None => Ok(Config::default()),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            path,
            max_file_size_mb,
            json,
        } => run_scan(&config, &path, max_file_size_mb, json),
        Commands::Batch {
            paths,
            output,
            max_file_size_mb,
        } => run_batch(&config, paths, output.as_deref(), max_file_size_mb),
        Commands::Submit {
            paths,
            max_file_size_mb,
        } => run_submit(&config, paths, max_file_size_mb).await,
    }
}

// =============================================================================
// COMMAND HANDLERS
// =============================================================================

fn max_bytes(config: &Config, override_mb: Option<u32>) -> u64 {
    override_mb.map_or_else(|| config.scan.max_file_size_bytes(), mb_to_bytes)
}

/// Scans one folder and prints its documents.
fn run_scan(
    config: &Config,
    path: &Utf8Path,
    max_file_size_mb: Option<u32>,
    json: bool,
) -> color_eyre::Result<()> {
    let scanner = DocumentScanner::new(config.scan.clone(), PdfSupport::detect());
    let outcome = scanner
        .scan(path, max_bytes(config, max_file_size_mb))
        .wrap_err_with(|| format!("Failed to scan {path}"))?;

    let mut stderr = std::io::stderr().lock();
    for message in outcome.stats.errors() {
        writeln!(stderr, "{message}")?;
    }
    if outcome.skipped > 0 {
        writeln!(stderr, "Skipped {} oversized file(s)", outcome.skipped)?;
    }

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &outcome.documents)?;
        writeln!(stdout)?;
        return Ok(());
    }

    for doc in &outcome.documents {
        print_document(&mut stdout, doc)?;
    }
    writeln!(stdout, "Total: {} documents", outcome.documents.len())?;
    Ok(())
}

fn print_document(out: &mut impl Write, doc: &DocumentRecord) -> std::io::Result<()> {
    writeln!(out, "{}", doc.filename())?;
    writeln!(
        out,
        "  Words: {}  Size: {:.1} KB",
        doc.word_count(),
        size_kb(doc.size_bytes())
    )?;
    let preview = doc.preview(PREVIEW_CHARS).replace('\n', " ");
    if preview.trim().is_empty() {
        writeln!(out, "  (no text)")
    } else if doc.text().chars().count() > PREVIEW_CHARS {
        writeln!(out, "  {preview}...")
    } else {
        writeln!(out, "  {preview}")
    }
}

/// Scans every folder in turn and writes the combined report.
fn run_batch(
    config: &Config,
    paths: Vec<Utf8PathBuf>,
    output: Option<&Utf8Path>,
    max_file_size_mb: Option<u32>,
) -> color_eyre::Result<()> {
    let scanner = DocumentScanner::new(config.scan.clone(), PdfSupport::detect());
    let max_file_size_bytes = max_bytes(config, max_file_size_mb);

    let mut report = BatchReport::new(Local::now(), paths.len());
    for path in paths {
        info!(folder = %path, "Scanning folder");
        let result = scanner
            .scan(&path, max_file_size_bytes)
            .map(|outcome| outcome.documents);
        if let Err(e) = &result {
            warn!(folder = %path, error = %e, "Folder scan failed");
        }
        report.record(path, result);
    }

    let json = serde_json::to_string_pretty(&report)?;
    let mut stdout = std::io::stdout().lock();
    match output {
        Some(file) => {
            std::fs::write(file, format!("{json}\n"))
                .wrap_err_with(|| format!("Failed to write report to {file}"))?;
            writeln!(stdout, "Report written to {file}")?;
        }
        None => writeln!(stdout, "{json}")?,
    }

    let summary = &report.summary;
    writeln!(
        stdout,
        "Folders: {}  Documents: {}  Words: {}  Failed: {}",
        summary.total_folders,
        summary.total_documents,
        summary.total_words,
        summary.failed_folders.len()
    )?;
    Ok(())
}

/// Submits every folder as a task, then waits for each in submission order.
async fn run_submit(
    config: &Config,
    paths: Vec<Utf8PathBuf>,
    max_file_size_mb: Option<u32>,
) -> color_eyre::Result<()> {
    let service = ScanService::new(config, PdfSupport::detect())?;

    let mut submitted = Vec::with_capacity(paths.len());
    for path in paths {
        let mut request = ScanRequest::new(path);
        if let Some(mb) = max_file_size_mb {
            request = request.with_max_file_size_mb(mb);
        }
        let task = service.submit_scan(request)?;
        info!(task_id = %task.task_id(), folder = %task.folder_path(), "Submitted");
        submitted.push(task.task_id());
    }

    let mut stdout = std::io::stdout().lock();
    for task_id in submitted {
        let task = service.wait_for_task(task_id).await?;
        match task.status() {
            TaskStatus::Completed => writeln!(
                stdout,
                "{task_id} {} {}: {} documents, {} words",
                task.status(),
                task.folder_path(),
                task.document_count(),
                task.word_count()
            )?,
            TaskStatus::Failed => writeln!(
                stdout,
                "{task_id} {} {}: {}",
                task.status(),
                task.folder_path(),
                task.error().unwrap_or_default()
            )?,
            status => return Err(eyre!("task {task_id} returned while {status}")),
        }
    }

    serde_json::to_writer_pretty(&mut stdout, &service.aggregate_stats())?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from(["docreader", "scan", "/data", "--max-file-size-mb", "5"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Scan { ref path, max_file_size_mb: Some(5), json: false } if path == "/data"
        ));
    }

    #[test]
    fn test_cli_rejects_out_of_range_size() {
        assert!(Cli::try_parse_from(["docreader", "scan", "/d", "--max-file-size-mb", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["docreader", "scan", "/d", "--max-file-size-mb", "1001"]).is_err()
        );
    }

    #[test]
    fn test_batch_requires_a_path() {
        assert!(Cli::try_parse_from(["docreader", "batch"]).is_err());
    }

    #[test]
    fn test_max_bytes_override() {
        let config = Config::default();
        assert_eq!(max_bytes(&config, None), 50 * 1024 * 1024);
        assert_eq!(max_bytes(&config, Some(2)), 2 * 1024 * 1024);
    }

    #[test]
    fn test_print_document_preview() {
        let doc = DocumentRecord::new(
            "/d/a.txt".into(),
            2048,
            "word ".repeat(20),
            Some("utf-8"),
        );
        let mut out = Vec::new();
        print_document(&mut out, &doc).unwrap();
        let text = String::from_utf8(out).unwrap();
        insta::assert_snapshot!(text, @r"
        a.txt
          Words: 20  Size: 2.0 KB
          word word word word word word word word word word word word ...
        ");
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("docreader.json")).unwrap();
        std::fs::write(&path, r#"{"scan": {"max_file_size_mb": 5}}"#).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.scan.max_file_size_mb, 5);
        assert_eq!(max_bytes(&config, None), 5 * 1024 * 1024);
    }

    #[test]
    fn test_load_config_rejects_invalid_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("docreader.json")).unwrap();
        std::fs::write(&path, r#"{"scan": {"max_file_size_mb": 0}}"#).unwrap();

        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
