use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{AppError, Result},
    models::Entry,
    storage::{HistoryPoint, PartitionStats},
    AppState,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<PartitionStats>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub tool: String,
    pub name: String,
    pub limit: usize,
    pub points: Vec<HistoryPoint>,
}

/// List every tool partition with its size and newest commit
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<ToolsResponse>> {
    let store = state.pipeline.store();
    let mut tools = Vec::new();
    for tool in store.tools().await? {
        tools.push(store.stats(&tool).await?);
    }
    Ok(Json(ToolsResponse { tools }))
}

pub async fn latest_entry(
    State(state): State<AppState>,
    Path(tool): Path<String>,
) -> Result<Json<Entry>> {
    let latest = state.pipeline.store().latest(&tool).await?;
    latest
        .map(|entry| Json(entry.as_ref().clone()))
        .ok_or_else(|| AppError::NotFound(format!("No entries for tool '{}'", tool)))
}

/// Newest-first values of one benchmark
pub async fn benchmark_history(
    State(state): State<AppState>,
    Path((tool, name)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 {
        return Err(AppError::ValidationError("limit must be greater than 0".to_string()));
    }

    let view = state.pipeline.store().history(&tool, &name, limit).await?;
    let points = view.to_vec();
    debug!(tool = %tool, name = %name, points = points.len(), "Served benchmark history");

    Ok(Json(HistoryResponse {
        tool,
        name,
        limit,
        points,
    }))
}
