use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::{
    error::Result,
    ingestion::{IngestionResult, IngestionStatus},
    AppState,
};

/// Ingest one raw entry for `tool`. A newly stored entry answers 201, a
/// commit that was already stored answers 200 with its original verdicts.
pub async fn ingest_entry(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: String,
) -> Result<(StatusCode, Json<IngestionResult>)> {
    info!(tool = %tool, bytes = body.len(), "🔄 Ingesting benchmark entry");

    let result = state.pipeline.ingest_json(Some(&tool), &body).await?;
    let status = match result.status {
        IngestionStatus::Ingested => StatusCode::CREATED,
        IngestionStatus::AlreadyIngested => StatusCode::OK,
    };
    Ok((status, Json(result)))
}
