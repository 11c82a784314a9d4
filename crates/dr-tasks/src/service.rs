//! The scan service: the contract a request layer builds on.
//!
//! [`ScanService`] ties the pieces together. Submitting a scan creates a
//! `Pending` task in the [`TaskStore`] and spawns a [`TaskRunner`] on the
//! captured Tokio runtime; the caller gets the task back immediately and
//! polls it (or awaits it) by ID.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dr_core::config::mb_to_bytes;
use dr_core::{
    AggregateStats, Config, DocumentRecord, ScanConfig, TaskId, TaskRecord, TaskStatus,
    TaskSummary, MAX_FILE_SIZE_MB_RANGE,
};
use dr_scanner::{DocumentScanner, PdfExtractor};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::info;

use crate::error::TaskError;
use crate::runner::{ActiveRunners, TaskRunner};
use crate::store::TaskStore;

/// A request to scan one folder.
///
/// # Examples
///
/// ```
/// use dr_tasks::ScanRequest;
///
/// let request: ScanRequest = serde_json::from_str(r#"{"folder_path": "/data"}"#).unwrap();
/// assert_eq!(request.max_file_size_mb, None);
///
/// let request = ScanRequest::new("/data").with_max_file_size_mb(10);
/// assert_eq!(request.max_file_size_mb, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// The folder to scan.
    pub folder_path: Utf8PathBuf,
    /// Per-file size cap in megabytes; the service default when `None`.
    #[serde(default)]
    pub max_file_size_mb: Option<u32>,
}

impl ScanRequest {
    /// Creates a request for `folder_path` with the default size cap.
    #[must_use]
    pub fn new(folder_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            folder_path: folder_path.into(),
            max_file_size_mb: None,
        }
    }

    /// Sets the per-file size cap.
    #[must_use]
    pub const fn with_max_file_size_mb(mut self, mb: u32) -> Self {
        self.max_file_size_mb = Some(mb);
        self
    }
}

/// Submits scans, tracks their tasks, and answers status queries.
///
/// `ScanService` is cheaply cloneable; clones share the task store and the
/// set of in-flight runners.
///
/// # Examples
///
/// ```no_run
/// use dr_core::Config;
/// use dr_scanner::PdfSupport;
/// use dr_tasks::{ScanRequest, ScanService};
///
/// # async fn example() -> Result<(), dr_tasks::TaskError> {
/// let service = ScanService::new(&Config::default(), PdfSupport::detect())?;
///
/// let task = service.submit_scan(ScanRequest::new("/data/docs"))?;
/// let done = service.wait_for_task(task.task_id()).await?;
/// println!("{}: {} documents", done.status(), done.document_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScanService {
    store: Arc<TaskStore>,
    scan_config: ScanConfig,
    pdf: Option<Arc<dyn PdfExtractor>>,
    runtime: Handle,
    active: ActiveRunners,
}

impl ScanService {
    /// Creates a service on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NoRuntime`] when called outside a runtime.
    pub fn new(config: &Config, pdf: Option<Arc<dyn PdfExtractor>>) -> Result<Self, TaskError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(config, pdf, runtime))
    }

    /// Creates a service that spawns runners on `runtime`.
    #[must_use]
    pub fn with_runtime(
        config: &Config,
        pdf: Option<Arc<dyn PdfExtractor>>,
        runtime: Handle,
    ) -> Self {
        Self {
            store: Arc::new(TaskStore::new(config.tasks)),
            scan_config: config.scan.clone(),
            pdf,
            runtime,
            active: ActiveRunners::new(),
        }
    }

    /// Creates a task for `request` and starts scanning in the background.
    ///
    /// Returns the task as created, still `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidRequest`] if the size cap is outside
    /// `1..=1000` MB. No task is created in that case.
    pub fn submit_scan(&self, request: ScanRequest) -> Result<TaskRecord, TaskError> {
        let max_mb = request
            .max_file_size_mb
            .unwrap_or(self.scan_config.max_file_size_mb);
        if !MAX_FILE_SIZE_MB_RANGE.contains(&max_mb) {
            return Err(TaskError::invalid_request(format!(
                "max_file_size_mb must be between {} and {}, got {max_mb}",
                MAX_FILE_SIZE_MB_RANGE.start(),
                MAX_FILE_SIZE_MB_RANGE.end()
            )));
        }

        let task = self.store.create(request.folder_path.clone(), max_mb);
        info!(
            task_id = %task.task_id(),
            folder = %request.folder_path,
            max_file_size_mb = max_mb,
            "Scan submitted"
        );

        // A fresh scanner per task keeps last-pass stats independent.
        // The handle is detached; the store records the outcome, including
        // a runner the runtime drops unstarted.
        let runner = TaskRunner::new(
            Arc::clone(&self.store),
            self.new_scanner(),
            task.task_id(),
            request.folder_path,
            mb_to_bytes(max_mb),
        )
        .with_registry(self.active.clone());
        drop(runner.spawn(&self.runtime));

        Ok(task)
    }

    /// Returns the current state of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown ID.
    pub fn get_task(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        self.store.get(task_id)
    }

    /// Lists task summaries in creation order, optionally filtered by status.
    #[must_use]
    pub fn list_tasks(&self, status: Option<TaskStatus>) -> Vec<TaskSummary> {
        self.store.list(status)
    }

    /// Folds live aggregate counters over every stored task.
    #[must_use]
    pub fn aggregate_stats(&self) -> AggregateStats {
        self.store.aggregate_stats()
    }

    /// Waits for a task to reach `Completed` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown ID.
    pub async fn wait_for_task(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        self.store.wait_terminal(task_id).await
    }

    /// Asks the runner of a task to stop before its next file.
    ///
    /// Returns `true` if a live runner was signalled. The task then ends
    /// `Failed` with the error `scan cancelled`, unless the scan had already
    /// finished its last file.
    pub fn cancel_task(&self, task_id: TaskId) -> bool {
        let signalled = self.active.cancel(task_id);
        if signalled {
            info!(task_id = %task_id, "Cancellation requested");
        }
        signalled
    }

    /// Scans `folder_path` on the calling thread with the configured size cap.
    ///
    /// No task is created.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Scan`] if the scan fails fatally.
    pub fn scan_blocking(
        &self,
        folder_path: impl AsRef<Utf8Path>,
    ) -> Result<Vec<DocumentRecord>, TaskError> {
        let outcome = self
            .new_scanner()
            .scan(folder_path.as_ref(), self.scan_config.max_file_size_bytes())?;
        Ok(outcome.documents)
    }

    /// Number of scans still running or waiting to run.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    fn new_scanner(&self) -> DocumentScanner {
        DocumentScanner::new(self.scan_config.clone(), self.pdf.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_core::TaskConfig;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    fn service() -> ScanService {
        ScanService::new(&Config::default(), None).unwrap()
    }

    fn folder_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_submit_returns_pending_task() {
        let dir = folder_with(&[("a.txt", "alpha")]);
        let service = service();

        let task = service.submit_scan(ScanRequest::new(utf8(&dir))).unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.max_file_size_mb(), 50);
        assert!(task.completed_at().is_none());

        let done = service.wait_for_task(task.task_id()).await.unwrap();
        assert_eq!(done.status(), TaskStatus::Completed);
        assert_eq!(done.document_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_size() {
        let service = service();
        for mb in [0, 1001] {
            let err = service
                .submit_scan(ScanRequest::new("/data").with_max_file_size_mb(mb))
                .unwrap_err();
            assert!(matches!(err, TaskError::InvalidRequest(_)));
        }
        assert!(service.list_tasks(None).is_empty());
    }

    #[tokio::test]
    async fn test_nonexistent_folder_fails() {
        let service = service();
        let task = service
            .submit_scan(ScanRequest::new("/does/not/exist"))
            .unwrap();

        let done = service.wait_for_task(task.task_id()).await.unwrap();
        assert_eq!(done.status(), TaskStatus::Failed);
        assert!(done.error().unwrap().contains("does not exist"));
        assert!(done.documents().is_none());
        assert!(done.completed_at().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_scans_are_independent() {
        let first = folder_with(&[("a.txt", "one"), ("b.txt", "two words")]);
        let second = folder_with(&[("c.md", "three little words")]);
        let service = service();

        let t1 = service.submit_scan(ScanRequest::new(utf8(&first))).unwrap();
        let t2 = service.submit_scan(ScanRequest::new(utf8(&second))).unwrap();

        let (d1, d2) = tokio::join!(
            service.wait_for_task(t1.task_id()),
            service.wait_for_task(t2.task_id())
        );
        let (d1, d2) = (d1.unwrap(), d2.unwrap());

        assert_eq!(d1.document_count(), 2);
        assert_eq!(d1.word_count(), 3);
        assert_eq!(d1.stats().unwrap().files_read(), 2);
        assert_eq!(d2.document_count(), 1);
        assert_eq!(d2.word_count(), 3);
        assert_eq!(d2.stats().unwrap().files_read(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_polling_never_sees_partial_terminal_state() {
        let files: Vec<(String, String)> = (0..50)
            .map(|i| (format!("f{i:02}.txt"), format!("word {i}")))
            .collect();
        let dir = TempDir::new().unwrap();
        for (name, contents) in &files {
            fs::write(dir.path().join(name), contents).unwrap();
        }

        let service = service();
        let id = service
            .submit_scan(ScanRequest::new(utf8(&dir)))
            .unwrap()
            .task_id();

        loop {
            let task = service.get_task(id).unwrap();
            match task.status() {
                TaskStatus::Pending | TaskStatus::Running => {
                    assert!(task.documents().is_none());
                    assert!(task.error().is_none());
                    assert!(task.completed_at().is_none());
                }
                TaskStatus::Completed => {
                    assert_eq!(task.documents().unwrap().len(), 50);
                    assert!(task.stats().is_some());
                    assert!(task.completed_at().is_some());
                    break;
                }
                TaskStatus::Failed => panic!("unexpected failure: {:?}", task.error()),
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_list_and_aggregate_stats() {
        let good = folder_with(&[("a.txt", "one two"), ("b.md", "three")]);
        let service = service();

        let ok = service.submit_scan(ScanRequest::new(utf8(&good))).unwrap();
        let bad = service.submit_scan(ScanRequest::new("/missing/folder")).unwrap();
        service.wait_for_task(ok.task_id()).await.unwrap();
        service.wait_for_task(bad.task_id()).await.unwrap();

        let completed = service.list_tasks(Some(TaskStatus::Completed));
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].task_id, ok.task_id());
        assert_eq!(completed[0].document_count, 2);

        let all: Vec<_> = service.list_tasks(None).iter().map(|s| s.task_id).collect();
        assert_eq!(all, [ok.task_id(), bad.task_id()]);

        let stats = service.aggregate_stats();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.failed_tasks, 1);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_words, 3);
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let err = service().get_task(TaskId::generate()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_finished_task_is_noop() {
        let dir = folder_with(&[("a.txt", "a")]);
        let service = service();
        let task = service.submit_scan(ScanRequest::new(utf8(&dir))).unwrap();
        service.wait_for_task(task.task_id()).await.unwrap();

        // The runner deregisters right after its terminal transition
        while service.in_flight() > 0 {
            tokio::task::yield_now().await;
        }
        assert!(!service.cancel_task(task.task_id()));
        assert_eq!(
            service.get_task(task.task_id()).unwrap().status(),
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_retention_applies_on_submit() {
        let dir = folder_with(&[("a.txt", "a")]);
        let config = Config {
            tasks: TaskConfig {
                retention_secs: None,
                max_tasks: Some(1),
            },
            ..Config::default()
        };
        let service = ScanService::new(&config, None).unwrap();

        let first = service.submit_scan(ScanRequest::new(utf8(&dir))).unwrap();
        service.wait_for_task(first.task_id()).await.unwrap();
        let second = service.submit_scan(ScanRequest::new(utf8(&dir))).unwrap();

        assert!(service.get_task(first.task_id()).unwrap_err().is_not_found());
        assert!(service.get_task(second.task_id()).is_ok());
    }

    #[test]
    fn test_new_outside_runtime() {
        let err = ScanService::new(&Config::default(), None).unwrap_err();
        assert!(matches!(err, TaskError::NoRuntime(_)));
    }

    #[test]
    fn test_submit_on_stopped_runtime_fails_task() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let service = ScanService::with_runtime(&Config::default(), None, runtime.handle().clone());
        drop(runtime);

        let task = service.submit_scan(ScanRequest::new("/data")).unwrap();

        let task = service.get_task(task.task_id()).unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some(crate::ABORTED_MESSAGE));
        assert_eq!(service.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_scan_blocking() {
        let dir = folder_with(&[("x.txt", "hello world")]);
        let docs = service().scan_blocking(utf8(&dir)).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].word_count(), 2);
        assert!(service().list_tasks(None).is_empty());
    }

    #[tokio::test]
    async fn test_task_record_json_shape() {
        let dir = folder_with(&[("a.txt", "hi")]);
        let service = service();
        let id = service
            .submit_scan(ScanRequest::new(utf8(&dir)))
            .unwrap()
            .task_id();
        let task = service.wait_for_task(id).await.unwrap();

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["documents"][0]["filename"], "a.txt");
        assert_eq!(json["stats"]["error_count"], 0);
        assert!(json.get("error").is_none());
    }
}
