//! Benchmark data model shared by the store, the detector and the pipeline.

pub mod benchmark;

pub use benchmark::*;
