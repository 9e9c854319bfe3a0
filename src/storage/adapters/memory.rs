use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::models::{Entry, OrderKey};
use crate::storage::{
    EntryList, HistoryStore, HistoryView, PartitionSet, PartitionSink, PartitionStats,
    StoreResult,
};

/// In-process history store. Nothing survives the process; used for tests
/// and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    partitions: PartitionSet,
    allow_backfill: bool,
}

/// Memory needs no durable step: publishing the new list is the commit point
struct InMemorySink;

#[async_trait]
impl PartitionSink for InMemorySink {
    async fn persist(&self, _tool: &str, _entries: &[Arc<Entry>]) -> StoreResult<()> {
        Ok(())
    }
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backfill(allow_backfill: bool) -> Self {
        Self {
            partitions: PartitionSet::new(),
            allow_backfill,
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, tool: &str, entry: Entry) -> StoreResult<()> {
        let partition = self.partitions.get_or_create(tool).await;
        let commit_id = entry.commit.id.clone();
        partition
            .append(entry, self.allow_backfill, &InMemorySink)
            .await?;
        debug!(tool, commit_id = %commit_id, "Appended entry to memory store");
        Ok(())
    }

    async fn history_before(
        &self,
        tool: &str,
        name: &str,
        limit: usize,
        before: Option<&OrderKey>,
    ) -> StoreResult<HistoryView> {
        Ok(self.partitions.history_before(tool, name, limit, before).await)
    }

    async fn latest(&self, tool: &str) -> StoreResult<Option<Arc<Entry>>> {
        Ok(self.partitions.latest(tool).await)
    }

    async fn get(&self, tool: &str, commit_id: &str) -> StoreResult<Option<Arc<Entry>>> {
        Ok(self.partitions.get_entry(tool, commit_id).await)
    }

    async fn entries(&self, tool: &str) -> StoreResult<EntryList> {
        Ok(self.partitions.entries(tool).await)
    }

    async fn tools(&self) -> StoreResult<Vec<String>> {
        Ok(self.partitions.tools().await)
    }

    async fn stats(&self, tool: &str) -> StoreResult<PartitionStats> {
        Ok(self.partitions.stats(tool).await)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn allows_backfill(&self) -> bool {
        self.allow_backfill
    }
}
