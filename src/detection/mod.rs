//! Performance regression detection
//!
//! Judges each measurement of a new entry against the median of its recent
//! history for the same tool and benchmark name.

pub mod config;
pub mod detector;
pub mod statistics;

pub use config::*;
pub use detector::*;
pub use statistics::BaselineStats;
