use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::ConfigError;
use crate::extract::ExtractError;
use crate::ingestion::IngestError;
use crate::storage::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Malformed entry: {}", .0.join("; "))]
    MalformedEntry(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MalformedEntry { issues } => AppError::MalformedEntry(issues),
            e @ IngestError::OutOfOrderTimestamp { .. } => AppError::Conflict(e.to_string()),
            IngestError::StoreUnavailable(e) => AppError::from(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            e @ (StoreError::DuplicateCommit { .. } | StoreError::OutOfOrderTimestamp { .. }) => {
                AppError::Conflict(e.to_string())
            }
            e @ StoreError::ToolMismatch { .. } => AppError::ValidationError(e.to_string()),
            e @ StoreError::ConfigurationError(_) => AppError::ConfigError(e.to_string()),
            e @ (StoreError::BackendUnavailable(_) | StoreError::Timeout(_)) => {
                AppError::StoreUnavailable(e.to_string())
            }
            e @ (StoreError::CorruptHistory { .. } | StoreError::SerializationError(_)) => {
                AppError::InternalServerError(e.to_string())
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::MalformedEntry(vec![err.to_string()])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MalformedEntry(issues) => (StatusCode::UNPROCESSABLE_ENTITY, issues.join("; ")),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::StoreUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
