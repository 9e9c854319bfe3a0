pub mod benchmarks;
pub mod health;
pub mod ingest;
