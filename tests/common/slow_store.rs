use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use benchtrail::{
    models::{Entry, OrderKey},
    storage::{EntryList, HistoryStore, HistoryView, MemoryHistoryStore, PartitionStats, StoreResult},
};

/// Memory store whose append of one commit takes `delay` before landing
pub struct SlowHistoryStore {
    inner: MemoryHistoryStore,
    slow_commit: String,
    delay: Duration,
}

impl SlowHistoryStore {
    pub fn new(slow_commit: &str, delay: Duration) -> Self {
        Self {
            inner: MemoryHistoryStore::new(),
            slow_commit: slow_commit.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl HistoryStore for SlowHistoryStore {
    async fn append(&self, tool: &str, entry: Entry) -> StoreResult<()> {
        if entry.commit.id == self.slow_commit {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.append(tool, entry).await
    }

    async fn history_before(
        &self,
        tool: &str,
        name: &str,
        limit: usize,
        before: Option<&OrderKey>,
    ) -> StoreResult<HistoryView> {
        self.inner.history_before(tool, name, limit, before).await
    }

    async fn latest(&self, tool: &str) -> StoreResult<Option<Arc<Entry>>> {
        self.inner.latest(tool).await
    }

    async fn get(&self, tool: &str, commit_id: &str) -> StoreResult<Option<Arc<Entry>>> {
        self.inner.get(tool, commit_id).await
    }

    async fn entries(&self, tool: &str) -> StoreResult<EntryList> {
        self.inner.entries(tool).await
    }

    async fn tools(&self) -> StoreResult<Vec<String>> {
        self.inner.tools().await
    }

    async fn stats(&self, tool: &str) -> StoreResult<PartitionStats> {
        self.inner.stats(tool).await
    }

    fn backend_name(&self) -> &'static str {
        "slow-memory"
    }

    fn allows_backfill(&self) -> bool {
        self.inner.allows_backfill()
    }
}
