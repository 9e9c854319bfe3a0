//! Per-tool partition state shared by the storage adapters.
//!
//! A partition publishes its entries as an immutable [`EntryList`]. Appends
//! take the partition's write lock, build the next list, hand it to the
//! durable [`PartitionSink`] and only then swap it in. Partitions never share
//! a write lock, so appends to different tools run independently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::models::{Entry, OrderKey};
use crate::storage::{
    EntryList, HistoryView, PartitionSink, PartitionStats, StoreError, StoreResult,
};

/// Published state: ordered entries plus a commit -> position index
#[derive(Debug, Default)]
struct PartitionState {
    entries: EntryList,
    commits: HashMap<String, usize>,
    /// Entry of the most recent append; differs from the last in order
    /// only after a backfill
    last_appended: Option<Arc<Entry>>,
}

impl PartitionState {
    /// State for entries loaded in order, with no append history to go by
    fn new(entries: Vec<Arc<Entry>>) -> Self {
        let last = entries.last().cloned();
        Self::with_last_appended(entries, last)
    }

    fn with_last_appended(entries: Vec<Arc<Entry>>, last_appended: Option<Arc<Entry>>) -> Self {
        let commits = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.commit.id.clone(), pos))
            .collect();
        Self {
            entries: Arc::new(entries),
            commits,
            last_appended,
        }
    }

    /// Number of entries ordered strictly before `key`
    fn position_before(&self, key: &OrderKey) -> usize {
        self.entries.partition_point(|e| {
            (e.timestamp, e.commit.id.as_str()) < (key.timestamp, key.commit_id.as_str())
        })
    }
}

#[derive(Debug)]
pub struct Partition {
    tool: String,
    write_lock: Mutex<()>,
    state: RwLock<Arc<PartitionState>>,
}

impl Partition {
    pub fn new(tool: impl Into<String>) -> Self {
        Self::with_entries(tool, Vec::new())
    }

    /// Build a partition from entries already in order (e.g. loaded from disk)
    pub fn with_entries(tool: impl Into<String>, entries: Vec<Arc<Entry>>) -> Self {
        Self {
            tool: tool.into(),
            write_lock: Mutex::new(()),
            state: RwLock::new(Arc::new(PartitionState::new(entries))),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    async fn state(&self) -> Arc<PartitionState> {
        self.state.read().await.clone()
    }

    pub async fn snapshot(&self) -> EntryList {
        self.state().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.state().await.entries.len()
    }

    pub async fn append(
        &self,
        entry: Entry,
        allow_backfill: bool,
        sink: &dyn PartitionSink,
    ) -> StoreResult<()> {
        if entry.tool != self.tool {
            return Err(StoreError::ToolMismatch {
                tool: self.tool.clone(),
                entry_tool: entry.tool,
            });
        }

        let _writer = self.write_lock.lock().await;
        let current = self.state().await;

        if current.commits.contains_key(&entry.commit.id) {
            return Err(StoreError::DuplicateCommit {
                tool: self.tool.clone(),
                commit_id: entry.commit.id,
            });
        }

        if let Some(last) = current.entries.last() {
            if entry.timestamp < last.timestamp && !allow_backfill {
                return Err(StoreError::OutOfOrderTimestamp {
                    tool: self.tool.clone(),
                    timestamp: entry.timestamp,
                    latest: last.timestamp,
                });
            }
        }

        let position = current.position_before(&entry.order_key());
        let entry = Arc::new(entry);
        let mut next = Vec::with_capacity(current.entries.len() + 1);
        next.extend(current.entries.iter().cloned());
        next.insert(position, Arc::clone(&entry));

        sink.persist(&self.tool, &next).await?;

        let next = Arc::new(PartitionState::with_last_appended(next, Some(entry)));
        debug!(
            tool = %self.tool,
            position,
            entries = next.entries.len(),
            "Published partition state"
        );
        *self.state.write().await = next;
        Ok(())
    }

    pub async fn history_before(
        &self,
        name: &str,
        limit: usize,
        before: Option<&OrderKey>,
    ) -> HistoryView {
        let state = self.state().await;
        let end = match before {
            Some(key) => state.position_before(key),
            None => state.entries.len(),
        };
        HistoryView::new(state.entries.clone(), end, name, limit)
    }

    /// Most recently appended entry. After a reload there is no append
    /// history, so this is the last entry in order.
    pub async fn latest(&self) -> Option<Arc<Entry>> {
        self.state().await.last_appended.clone()
    }

    pub async fn get(&self, commit_id: &str) -> Option<Arc<Entry>> {
        let state = self.state().await;
        state
            .commits
            .get(commit_id)
            .and_then(|pos| state.entries.get(*pos))
            .cloned()
    }

    pub async fn stats(&self) -> PartitionStats {
        let state = self.state().await;
        let latest = state.entries.last();
        PartitionStats {
            tool: self.tool.clone(),
            entry_count: state.entries.len(),
            latest_timestamp: latest.map(|e| e.timestamp),
            latest_commit: latest.map(|e| e.commit.id.clone()),
        }
    }
}

/// All partitions of a store, created on first use
#[derive(Debug, Default)]
pub struct PartitionSet {
    partitions: RwLock<HashMap<String, Arc<Partition>>>,
}

impl PartitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partitions(partitions: Vec<Partition>) -> Self {
        let map = partitions
            .into_iter()
            .map(|p| (p.tool.clone(), Arc::new(p)))
            .collect();
        Self {
            partitions: RwLock::new(map),
        }
    }

    pub async fn get(&self, tool: &str) -> Option<Arc<Partition>> {
        self.partitions.read().await.get(tool).cloned()
    }

    pub async fn get_or_create(&self, tool: &str) -> Arc<Partition> {
        if let Some(partition) = self.get(tool).await {
            return partition;
        }
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(tool.to_string())
            .or_insert_with(|| Arc::new(Partition::new(tool)))
            .clone()
    }

    pub async fn history_before(
        &self,
        tool: &str,
        name: &str,
        limit: usize,
        before: Option<&OrderKey>,
    ) -> HistoryView {
        match self.get(tool).await {
            Some(partition) => partition.history_before(name, limit, before).await,
            None => HistoryView::empty(name),
        }
    }

    pub async fn latest(&self, tool: &str) -> Option<Arc<Entry>> {
        match self.get(tool).await {
            Some(partition) => partition.latest().await,
            None => None,
        }
    }

    pub async fn get_entry(&self, tool: &str, commit_id: &str) -> Option<Arc<Entry>> {
        match self.get(tool).await {
            Some(partition) => partition.get(commit_id).await,
            None => None,
        }
    }

    pub async fn entries(&self, tool: &str) -> EntryList {
        match self.get(tool).await {
            Some(partition) => partition.snapshot().await,
            None => Arc::new(Vec::new()),
        }
    }

    pub async fn tools(&self) -> Vec<String> {
        let partitions: Vec<Arc<Partition>> =
            self.partitions.read().await.values().cloned().collect();

        let mut tools = Vec::with_capacity(partitions.len());
        for partition in partitions {
            if partition.len().await > 0 {
                tools.push(partition.tool.clone());
            }
        }
        tools.sort();
        tools
    }

    pub async fn stats(&self, tool: &str) -> PartitionStats {
        match self.get(tool).await {
            Some(partition) => partition.stats().await,
            None => PartitionStats {
                tool: tool.to_string(),
                entry_count: 0,
                latest_timestamp: None,
                latest_commit: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitInfo, Measurement};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct NoopSink;

    #[async_trait]
    impl PartitionSink for NoopSink {
        async fn persist(&self, _tool: &str, _entries: &[Arc<Entry>]) -> StoreResult<()> {
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl PartitionSink for FailingSink {
        async fn persist(&self, _tool: &str, _entries: &[Arc<Entry>]) -> StoreResult<()> {
            Err(StoreError::BackendUnavailable("disk full".to_string()))
        }
    }

    fn entry(commit: &str, millis: i64) -> Entry {
        Entry {
            commit: CommitInfo::new(commit),
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            tool: "go".to_string(),
            measurements: vec![Measurement::new("BenchmarkA", millis as f64, "ns/op")],
        }
    }

    #[tokio::test]
    async fn test_failed_persist_publishes_nothing() {
        let partition = Partition::new("go");
        partition.append(entry("c1", 10), false, &NoopSink).await.unwrap();

        let err = partition
            .append(entry("c2", 20), false, &FailingSink)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BackendUnavailable(_)));
        assert_eq!(partition.len().await, 1);
        assert!(partition.get("c2").await.is_none());
    }

    #[tokio::test]
    async fn test_backfill_inserts_in_order() {
        let partition = Partition::new("go");
        partition.append(entry("c1", 10), true, &NoopSink).await.unwrap();
        partition.append(entry("c3", 30), true, &NoopSink).await.unwrap();
        partition.append(entry("c2", 20), true, &NoopSink).await.unwrap();

        let commits: Vec<String> = partition
            .snapshot()
            .await
            .iter()
            .map(|e| e.commit.id.clone())
            .collect();
        assert_eq!(commits, vec!["c1", "c2", "c3"]);
        assert_eq!(partition.get("c2").await.unwrap().commit.id, "c2");
        assert_eq!(partition.latest().await.unwrap().commit.id, "c2");
        // Stats describe the newest entry in order, not the backfilled one
        assert_eq!(partition.stats().await.latest_commit.as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn test_failed_append_keeps_previous_latest() {
        let partition = Partition::new("go");
        partition.append(entry("c1", 10), true, &NoopSink).await.unwrap();
        partition.append(entry("c3", 30), true, &NoopSink).await.unwrap();

        partition
            .append(entry("c2", 20), true, &FailingSink)
            .await
            .unwrap_err();
        assert_eq!(partition.latest().await.unwrap().commit.id, "c3");

        let loaded = Partition::with_entries("go", partition.snapshot().await.to_vec());
        assert_eq!(loaded.latest().await.unwrap().commit.id, "c3");
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_appends() {
        let partition = Partition::new("go");
        partition.append(entry("c1", 10), false, &NoopSink).await.unwrap();
        let before = partition.snapshot().await;

        partition.append(entry("c2", 20), false, &NoopSink).await.unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(partition.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_entry_of_other_tool() {
        let partition = Partition::new("js");
        let err = partition
            .append(entry("c1", 10), false, &NoopSink)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ToolMismatch { .. }));
    }
}
