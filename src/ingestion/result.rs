use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detection::{MeasurementReport, Verdict, VerdictSummary};
use crate::models::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    /// The entry was appended by this call
    Ingested,
    /// The commit was already stored; nothing was written
    AlreadyIngested,
}

/// Outcome of one ingestion, consumed by notifiers and dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub id: Uuid,
    pub status: IngestionStatus,
    pub tool: String,
    pub entry: Entry,
    pub reports: Vec<MeasurementReport>,
    pub summary: VerdictSummary,
    pub processed_at: DateTime<Utc>,
}

impl IngestionResult {
    pub fn new(status: IngestionStatus, entry: Entry, reports: Vec<MeasurementReport>) -> Self {
        let summary = VerdictSummary::from_reports(&reports);
        Self {
            id: Uuid::new_v4(),
            status,
            tool: entry.tool.clone(),
            entry,
            reports,
            summary,
            processed_at: Utc::now(),
        }
    }

    pub fn has_regressions(&self) -> bool {
        self.summary.has_regressions()
    }

    pub fn regressions(&self) -> impl Iterator<Item = &MeasurementReport> {
        self.reports
            .iter()
            .filter(|r| r.verdict == Verdict::Regressed)
    }

    pub fn report(&self, name: &str) -> Option<&MeasurementReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}
