//! benchtrail - benchmark history and regression tracking
//!
//! Stores benchmark results per tool, ordered by commit time, and judges
//! every new result against the recent history of the same benchmark.

use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod detection;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod routes;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfiguration;
pub use detection::{DetectionConfig, RegressionDetector, Verdict};
pub use error::{AppError, Result};
pub use ingestion::{IngestError, IngestionPipeline, IngestionResult, IngestionStatus};
pub use models::{CommitInfo, Direction, Entry, Measurement};
pub use storage::{HistoryStore, StoreError, StoreFactory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub env: Arc<AppConfiguration>,
    pub pipeline: Arc<IngestionPipeline>,
}

impl AppState {
    pub fn new(env: AppConfiguration, store: Arc<dyn HistoryStore>) -> Self {
        let pipeline = IngestionPipeline::new(store, RegressionDetector::new(env.detection.clone()))
            .with_append_timeout(env.storage.append_timeout());
        Self {
            env: Arc::new(env),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Open the configured store and wire the pipeline around it
    pub async fn from_config(env: AppConfiguration) -> std::result::Result<Self, StoreError> {
        let store = StoreFactory::create_store(&env.storage).await?;
        Ok(Self::new(env, store))
    }
}

/// Build the HTTP application with tracing and CORS layers
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::create_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
