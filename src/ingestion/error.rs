use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StoreError;

/// Why one ingestion attempt failed. An already stored commit is not an
/// error; it comes back as `IngestionStatus::AlreadyIngested`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed entry: {}", .issues.join("; "))]
    MalformedEntry { issues: Vec<String> },

    #[error(
        "Entry timestamp {timestamp} for tool '{tool}' precedes latest stored timestamp {latest}"
    )]
    OutOfOrderTimestamp {
        tool: String,
        timestamp: DateTime<Utc>,
        latest: DateTime<Utc>,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),
}

impl IngestError {
    pub fn malformed(issue: impl Into<String>) -> Self {
        IngestError::MalformedEntry {
            issues: vec![issue.into()],
        }
    }

    /// Only storage failures are worth retrying with the same payload
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::StoreUnavailable(e) if e.is_retryable())
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfOrderTimestamp {
                tool,
                timestamp,
                latest,
            } => IngestError::OutOfOrderTimestamp {
                tool,
                timestamp,
                latest,
            },
            other => IngestError::StoreUnavailable(other),
        }
    }
}
