use std::sync::Arc;

use benchtrail::{
    detection::{DetectionConfig, RegressionDetector},
    ingestion::{IngestionPipeline, RawEntry},
    models::{CommitInfo, Entry, Measurement},
    storage::{HistoryStore, MemoryHistoryStore},
};
use chrono::{DateTime, Utc};

use super::at;

/// Builder for test entries
pub struct EntryBuilder {
    tool: String,
    commit_id: String,
    timestamp: DateTime<Utc>,
    measurements: Vec<Measurement>,
}

impl EntryBuilder {
    pub fn new(tool: &str, commit_id: &str) -> Self {
        Self {
            tool: tool.to_string(),
            commit_id: commit_id.to_string(),
            timestamp: at(0),
            measurements: Vec::new(),
        }
    }

    pub fn at(mut self, seconds: i64) -> Self {
        self.timestamp = at(seconds);
        self
    }

    pub fn bench(mut self, name: &str, value: f64, unit: &str) -> Self {
        self.measurements.push(Measurement::new(name, value, unit));
        self
    }

    pub fn ns(self, name: &str, value: f64) -> Self {
        self.bench(name, value, "ns/op")
    }

    pub fn build(self) -> Entry {
        Entry {
            commit: CommitInfo::new(self.commit_id),
            timestamp: self.timestamp,
            tool: self.tool,
            measurements: self.measurements,
        }
    }

    pub fn raw(self) -> RawEntry {
        self.build().into()
    }
}

/// Pipeline over a fresh memory store, returned alongside the store
pub fn memory_pipeline(config: DetectionConfig) -> (IngestionPipeline, Arc<dyn HistoryStore>) {
    let store: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());
    let pipeline = IngestionPipeline::new(Arc::clone(&store), RegressionDetector::new(config));
    (pipeline, store)
}
