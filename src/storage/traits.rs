use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Entry, OrderKey};
use crate::storage::{EntryList, HistoryView, PartitionStats, StoreResult};

/// Append-only, tool-partitioned history of benchmark entries.
///
/// Implementations serialize appends per partition and publish a new entry
/// list only after it is durable, so readers observe either the state before
/// or after an append and never a partial entry.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an entry to the `tool` partition.
    ///
    /// Fails with `DuplicateCommit` when the commit id is already stored and
    /// with `OutOfOrderTimestamp` when the entry is older than the partition
    /// maximum and backfill is disabled.
    async fn append(&self, tool: &str, entry: Entry) -> StoreResult<()>;

    /// Most recent `limit` values of `name`, newest first
    async fn history(&self, tool: &str, name: &str, limit: usize) -> StoreResult<HistoryView> {
        self.history_before(tool, name, limit, None).await
    }

    /// Like [`HistoryStore::history`] but only over entries ordered strictly
    /// before `before`
    async fn history_before(
        &self,
        tool: &str,
        name: &str,
        limit: usize,
        before: Option<&OrderKey>,
    ) -> StoreResult<HistoryView>;

    /// Most recently appended entry of the partition. Without backfill this
    /// is also the greatest in `(timestamp, commit)` order; after a reopen it
    /// is the greatest in order.
    async fn latest(&self, tool: &str) -> StoreResult<Option<Arc<Entry>>>;

    /// Stored entry for a commit, if any
    async fn get(&self, tool: &str, commit_id: &str) -> StoreResult<Option<Arc<Entry>>>;

    async fn contains_commit(&self, tool: &str, commit_id: &str) -> StoreResult<bool> {
        Ok(self.get(tool, commit_id).await?.is_some())
    }

    /// Ordered snapshot of the whole partition
    async fn entries(&self, tool: &str) -> StoreResult<EntryList>;

    /// Names of all non-empty partitions, sorted
    async fn tools(&self) -> StoreResult<Vec<String>>;

    async fn stats(&self, tool: &str) -> StoreResult<PartitionStats>;

    /// Get the backend name/type
    fn backend_name(&self) -> &'static str;

    /// Whether older entries may be inserted behind newer ones
    fn allows_backfill(&self) -> bool;
}

/// Durable write step used by a partition before it publishes new state
#[async_trait]
pub trait PartitionSink: Send + Sync {
    /// Persist the complete, ordered entry list of `tool`
    async fn persist(&self, tool: &str, entries: &[Arc<Entry>]) -> StoreResult<()>;
}
