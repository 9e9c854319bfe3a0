use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Entry;

/// Published, immutable list of a partition's entries in order.
///
/// Appends build a new list and swap it in, so holders of an older list keep
/// a consistent view.
pub type EntryList = Arc<Vec<Arc<Entry>>>;

/// One point of a measurement's time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub commit_id: String,
    pub value: f64,
    pub unit: String,
}

/// Newest-first series of one measurement name.
///
/// Holds a snapshot of the partition rather than copies of the values, so
/// nothing is materialized until iterated, and iterating twice yields the
/// same points.
#[derive(Debug, Clone)]
pub struct HistoryView {
    entries: EntryList,
    end: usize,
    name: String,
    limit: usize,
}

impl HistoryView {
    /// View over `entries[..end]`
    pub fn new(entries: EntryList, end: usize, name: impl Into<String>, limit: usize) -> Self {
        let end = end.min(entries.len());
        Self {
            entries,
            end,
            name: name.into(),
            limit,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(Arc::new(Vec::new()), 0, name, 0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            entries: &self.entries[..self.end],
            name: &self.name,
            remaining: self.limit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a HistoryView {
    type Item = HistoryPoint;
    type IntoIter = HistoryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator behind [`HistoryView`]; walks the snapshot backwards
#[derive(Debug, Clone)]
pub struct HistoryIter<'a> {
    entries: &'a [Arc<Entry>],
    name: &'a str,
    remaining: usize,
}

impl Iterator for HistoryIter<'_> {
    type Item = HistoryPoint;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let (entry, rest) = self.entries.split_last()?;
            self.entries = rest;

            if let Some(measurement) = entry.measurement(self.name) {
                self.remaining -= 1;
                return Some(HistoryPoint {
                    timestamp: entry.timestamp,
                    commit_id: entry.commit.id.clone(),
                    value: measurement.value,
                    unit: measurement.unit.clone(),
                });
            }
        }
        None
    }
}

/// Summary of one tool partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub tool: String,
    pub entry_count: usize,
    /// Newest entry in `(timestamp, commit)` order
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub latest_commit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitInfo, Measurement};
    use chrono::TimeZone;

    fn entry(commit: &str, millis: i64, benches: &[(&str, f64)]) -> Arc<Entry> {
        Arc::new(Entry {
            commit: CommitInfo::new(commit),
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            tool: "go".to_string(),
            measurements: benches
                .iter()
                .map(|(name, value)| Measurement::new(*name, *value, "ns/op"))
                .collect(),
        })
    }

    #[test]
    fn test_view_is_newest_first_and_skips_missing_names() {
        let entries: EntryList = Arc::new(vec![
            entry("c1", 1, &[("A", 1.0), ("B", 10.0)]),
            entry("c2", 2, &[("B", 20.0)]),
            entry("c3", 3, &[("A", 3.0)]),
        ]);

        let view = HistoryView::new(entries.clone(), entries.len(), "A", 10);
        let values: Vec<f64> = view.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 1.0]);

        let view = HistoryView::new(entries, 3, "B", 1);
        let points = view.to_vec();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].commit_id, "c2");
    }

    #[test]
    fn test_view_is_restartable_and_bounded_by_end() {
        let entries: EntryList = Arc::new(vec![
            entry("c1", 1, &[("A", 1.0)]),
            entry("c2", 2, &[("A", 2.0)]),
        ]);

        let view = HistoryView::new(entries, 1, "A", 5);
        let first: Vec<_> = view.iter().collect();
        let second: Vec<_> = (&view).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].value, 1.0);
    }

    #[test]
    fn test_zero_limit_yields_nothing() {
        let entries: EntryList = Arc::new(vec![entry("c1", 1, &[("A", 1.0)])]);
        let view = HistoryView::new(entries, 1, "A", 0);
        assert!(view.is_empty());
    }
}
