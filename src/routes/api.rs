use crate::{
    handlers::{
        benchmarks::{benchmark_history, latest_entry, list_tools},
        health::health_checker_handler,
        ingest::ingest_entry,
    },
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Create the API router, mounted under `/api`
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/healthchecker", get(health_checker_handler))
        // Read side
        .route("/tools", get(list_tools))
        .route("/tools/:tool/latest", get(latest_entry))
        .route("/tools/:tool/benchmarks/:name/history", get(benchmark_history))
        // Ingestion
        .route("/tools/:tool/entries", post(ingest_entry))
}
