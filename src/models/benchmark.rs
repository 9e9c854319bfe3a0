use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Person attached to a commit (author or committer)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitPerson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Source-control metadata for the benchmarked code state.
///
/// Only `id` takes part in storage semantics; everything else is carried
/// through for reporting collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<CommitPerson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<CommitPerson>,
}

impl CommitInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A single benchmark observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
    pub unit: String,
    /// Spread reported by the harness, e.g. "± 2%"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Sample or iteration counts and other free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// One CI run's measurements for a single tool.
///
/// The serialized field names (`commit`, `date`, `tool`, `benches`) follow the
/// `BENCHMARK_DATA` document produced by benchmark dashboards, with `date`
/// stored as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub commit: CommitInfo,
    #[serde(rename = "date", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    #[serde(rename = "benches")]
    pub measurements: Vec<Measurement>,
}

impl Entry {
    pub fn commit_id(&self) -> &str {
        &self.commit.id
    }

    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(self.timestamp, self.commit.id.clone())
    }

    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }
}

/// Position of an entry inside its partition: timestamp first, commit id as tiebreak
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub timestamp: DateTime<Utc>,
    pub commit_id: String,
}

impl OrderKey {
    pub fn new(timestamp: DateTime<Utc>, commit_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            commit_id: commit_id.into(),
        }
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.commit_id.cmp(&other.commit_id))
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.commit_id, self.timestamp.to_rfc3339())
    }
}

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Latency, allocations, binary size
    #[default]
    #[serde(alias = "smaller_is_better")]
    LowerIsBetter,
    /// Throughput, operations per second
    #[serde(alias = "bigger_is_better")]
    HigherIsBetter,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LowerIsBetter => write!(f, "lower_is_better"),
            Direction::HigherIsBetter => write!(f, "higher_is_better"),
        }
    }
}
