//! One ingestion cycle: validate, de-duplicate, append, detect.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::detection::{BaselineWindow, MeasurementReport, RegressionDetector};
use crate::ingestion::{
    EntryValidator, IngestError, IngestionResult, IngestionStatus, RawEntry,
};
use crate::models::Entry;
use crate::storage::{BenchmarkDataDocument, HistoryStore, ImportSummary, StoreError};

/// Orchestrates ingestion against a shared history store.
///
/// Ingestions for the same tool are serialized so the duplicate check, the
/// baseline read and the append see one consistent partition; different
/// tools never wait on each other.
pub struct IngestionPipeline {
    store: Arc<dyn HistoryStore>,
    detector: RegressionDetector,
    append_timeout: Option<Duration>,
    writers: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn HistoryStore>, detector: RegressionDetector) -> Self {
        Self {
            store,
            detector,
            append_timeout: None,
            writers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_append_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.append_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn detector(&self) -> &RegressionDetector {
        &self.detector
    }

    /// Ingest a JSON payload; parse failures are `MalformedEntry`
    pub async fn ingest_json(
        &self,
        tool_hint: Option<&str>,
        body: &str,
    ) -> Result<IngestionResult, IngestError> {
        let raw: RawEntry = serde_json::from_str(body)
            .map_err(|e| IngestError::malformed(format!("invalid JSON: {}", e)))?;
        self.ingest(raw, tool_hint).await
    }

    /// Ingest an already typed entry; it still goes through validation
    pub async fn ingest_entry(&self, entry: Entry) -> Result<IngestionResult, IngestError> {
        let tool = entry.tool.clone();
        self.ingest(entry.into(), Some(&tool)).await
    }

    #[tracing::instrument(level = "info", skip(self, raw))]
    pub async fn ingest(
        &self,
        raw: RawEntry,
        tool_hint: Option<&str>,
    ) -> Result<IngestionResult, IngestError> {
        let validator = EntryValidator::new(&self.detector.config().directions);
        let entry = validator
            .validate(raw, tool_hint, Utc::now())
            .map_err(|issues| {
                warn!(issues = ?issues, "Rejected malformed entry");
                IngestError::MalformedEntry { issues }
            })?;

        // Held until the append task finishes, even if this call times out
        let guard = self.writer_for(&entry.tool).await.lock_owned().await;

        if let Some(stored) = self.store.get(&entry.tool, entry.commit_id()).await? {
            return self.already_ingested(stored.as_ref().clone(), &entry).await;
        }

        // Read the baseline before the append so the entry never judges itself
        let window = self.baseline_window(&entry).await?;

        match self.append(entry.clone(), guard).await {
            Ok(()) => {}
            Err(StoreError::DuplicateCommit { .. }) => {
                // Another writer outside this pipeline stored the commit first
                let stored = self.store.get(&entry.tool, entry.commit_id()).await?;
                let stored = stored.map(|e| e.as_ref().clone()).unwrap_or_else(|| entry.clone());
                return self.already_ingested(stored, &entry).await;
            }
            Err(e) => {
                warn!(tool = %entry.tool, commit_id = %entry.commit.id, error = %e, "Append failed");
                return Err(e.into());
            }
        }

        let reports = self.detector.classify_entry(&entry, &window);
        let result = IngestionResult::new(IngestionStatus::Ingested, entry, reports);
        log_outcome(&result);
        Ok(result)
    }

    async fn already_ingested(
        &self,
        stored: Entry,
        incoming: &Entry,
    ) -> Result<IngestionResult, IngestError> {
        if stored.measurements != incoming.measurements {
            warn!(
                tool = %stored.tool,
                commit_id = %stored.commit.id,
                "Commit already ingested with different measurements; keeping stored entry"
            );
        }

        let window = self.baseline_window(&stored).await?;
        let reports: Vec<MeasurementReport> = self.detector.classify_entry(&stored, &window);
        info!(tool = %stored.tool, commit_id = %stored.commit.id, "Commit already ingested");
        Ok(IngestionResult::new(
            IngestionStatus::AlreadyIngested,
            stored,
            reports,
        ))
    }

    /// Prior values of every measurement in `entry`, from entries ordered
    /// strictly before it
    async fn baseline_window(&self, entry: &Entry) -> Result<BaselineWindow, IngestError> {
        let key = entry.order_key();
        let limit = self.detector.config().window_size;
        let mut window = BaselineWindow::new();
        for measurement in &entry.measurements {
            let view = self
                .store
                .history_before(&entry.tool, &measurement.name, limit, Some(&key))
                .await?;
            window.insert_view(&view);
        }
        debug!(tool = %entry.tool, names = window.len(), "Collected baseline window");
        Ok(window)
    }

    /// Append on a task of its own that owns the tool's writer guard, so a
    /// caller timing out neither interrupts the durable write nor lets the
    /// next ingestion for the tool run before it lands.
    async fn append(&self, entry: Entry, guard: OwnedMutexGuard<()>) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        let tool = entry.tool.clone();
        let commit_id = entry.commit.id.clone();
        let mut task = tokio::spawn(async move {
            let _guard = guard;
            store.append(&tool, entry).await
        });

        let joined = match self.append_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(commit_id = %commit_id, timeout = ?limit, "Append still running after timeout");
                    tokio::spawn(report_detached_append(task, commit_id));
                    return Err(StoreError::Timeout(limit));
                }
            },
            None => task.await,
        };

        joined.map_err(|e| StoreError::BackendUnavailable(format!("append task failed: {}", e)))?
    }

    /// Replay every entry of `document` through validation and append, in
    /// partition order. Already stored commits and invalid entries are
    /// skipped and counted; any other failure aborts the import.
    pub async fn import_document(
        &self,
        document: BenchmarkDataDocument,
    ) -> Result<ImportSummary, IngestError> {
        let mut by_tool: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
        for entry in document.entries.into_values().flatten() {
            by_tool.entry(entry.tool.clone()).or_default().push(entry);
        }

        let mut summary = ImportSummary::default();
        for (tool, mut list) in by_tool {
            list.sort_by_key(|e| e.order_key());
            for entry in list {
                match self.ingest(entry.into(), Some(&tool)).await {
                    Ok(result) if result.status == IngestionStatus::Ingested => summary.appended += 1,
                    Ok(_) => summary.skipped_duplicates += 1,
                    Err(IngestError::MalformedEntry { issues }) => {
                        warn!(tool = %tool, issues = ?issues, "Skipping invalid entry in document");
                        summary.skipped_invalid += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            appended = summary.appended,
            skipped_duplicates = summary.skipped_duplicates,
            skipped_invalid = summary.skipped_invalid,
            "Imported benchmark data document"
        );
        Ok(summary)
    }

    async fn writer_for(&self, tool: &str) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().await;
        writers
            .entry(tool.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

async fn report_detached_append(
    task: tokio::task::JoinHandle<Result<(), StoreError>>,
    commit_id: String,
) {
    match task.await {
        Ok(Ok(())) => warn!(commit_id = %commit_id, "Timed out append completed"),
        Ok(Err(e)) => error!(commit_id = %commit_id, error = %e, "Timed out append failed"),
        Err(e) => error!(commit_id = %commit_id, error = %e, "Timed out append task aborted"),
    }
}

fn log_outcome(result: &IngestionResult) {
    let summary = &result.summary;
    info!(
        tool = %result.tool,
        commit_id = %result.entry.commit.id,
        measurements = result.reports.len(),
        regressed = summary.regressed,
        improved = summary.improved,
        stable = summary.stable,
        baseline = summary.baseline,
        "Entry ingested"
    );

    for report in result.regressions() {
        warn!(
            tool = %result.tool,
            benchmark = %report.name,
            value = report.value,
            reference = report.reference.unwrap_or_default(),
            ratio = report.ratio.unwrap_or_default(),
            "Performance regression detected"
        );
    }
}
