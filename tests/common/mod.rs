#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

pub mod builders;
pub mod slow_store;

pub use builders::*;
pub use slow_store::SlowHistoryStore;

/// Fixed instant `seconds` after a 2024 reference point
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + seconds, 0)
        .single()
        .expect("valid test timestamp")
}
