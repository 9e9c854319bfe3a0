use axum::{extract::State, response::Json};
use serde_json::json;

use crate::{error::Result, AppState};

pub async fn health_checker_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let store = state.pipeline.store();
    let tools = store.tools().await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Benchmark history server is running",
        "store": store.backend_name(),
        "tools": tools.len(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
