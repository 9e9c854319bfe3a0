use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during history store operations
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Commit {commit_id} already stored for tool '{tool}'")]
    DuplicateCommit { tool: String, commit_id: String },

    #[error(
        "Entry timestamp {timestamp} for tool '{tool}' precedes latest stored timestamp {latest}"
    )]
    OutOfOrderTimestamp {
        tool: String,
        timestamp: DateTime<Utc>,
        latest: DateTime<Utc>,
    },

    #[error("Entry for tool '{entry_tool}' cannot be stored in partition '{tool}'")]
    ToolMismatch { tool: String, entry_tool: String },

    #[error("Corrupt history for tool '{tool}': {reason}")]
    CorruptHistory { tool: String, reason: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Operation timeout after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

impl StoreError {
    /// Check if the whole append may be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::BackendUnavailable(_) | StoreError::Timeout(_)
        )
    }

    /// Whether the failure came from the durable-write step rather than the
    /// duplicate/ordering checks
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::BackendUnavailable(_)
                | StoreError::Timeout(_)
                | StoreError::SerializationError(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::BackendUnavailable(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
