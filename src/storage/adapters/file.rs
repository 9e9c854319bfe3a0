use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Entry, OrderKey};
use crate::storage::{
    EntryList, HistoryStore, HistoryView, Partition, PartitionSet, PartitionSink,
    PartitionStats, StoreError, StoreResult,
};

const PARTITION_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Durable history store keeping one JSON array of entries per tool.
///
/// Every append rewrites the partition file through a temp file that is
/// fsynced and renamed over the old one, so a crash leaves either the old or
/// the new array on disk.
pub struct FileHistoryStore {
    partitions: PartitionSet,
    sink: JsonFileSink,
    allow_backfill: bool,
}

struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    fn partition_path(&self, tool: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", encode_tool(tool), PARTITION_SUFFIX))
    }

    fn temp_path(&self, tool: &str) -> PathBuf {
        self.dir.join(format!(
            ".{}{}.{}{}",
            encode_tool(tool),
            PARTITION_SUFFIX,
            Uuid::new_v4().simple(),
            TEMP_SUFFIX
        ))
    }

    async fn write_atomically(&self, target: &Path, temp: &Path, bytes: &[u8]) -> StoreResult<()> {
        let mut file = File::create(temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp, target).await?;
        sync_dir(&self.dir).await
    }
}

#[async_trait]
impl PartitionSink for JsonFileSink {
    async fn persist(&self, tool: &str, entries: &[Arc<Entry>]) -> StoreResult<()> {
        let document: Vec<&Entry> = entries.iter().map(|e| e.as_ref()).collect();
        let bytes = serde_json::to_vec_pretty(&document)?;

        let target = self.partition_path(tool);
        let temp = self.temp_path(tool);

        if let Err(e) = self.write_atomically(&target, &temp, &bytes).await {
            // The old partition file is untouched; only the temp file can be left over
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        debug!(
            tool,
            path = %target.display(),
            bytes = bytes.len(),
            "Persisted partition"
        );
        Ok(())
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> StoreResult<()> {
    File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> StoreResult<()> {
    Ok(())
}

impl FileHistoryStore {
    /// Open (or create) a store rooted at `dir`, loading every partition file
    pub async fn open(dir: impl Into<PathBuf>, allow_backfill: bool) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let mut partitions = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(dirent) = read_dir.next_entry().await? {
            let path = dirent.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if file_name.starts_with('.') && file_name.ends_with(TEMP_SUFFIX) {
                warn!(path = %path.display(), "Removing leftover temp file from interrupted append");
                let _ = fs::remove_file(&path).await;
                continue;
            }

            let Some(stem) = file_name.strip_suffix(PARTITION_SUFFIX) else {
                continue;
            };
            let Some(tool) = decode_tool(stem) else {
                warn!(path = %path.display(), "Skipping file with undecodable tool name");
                continue;
            };

            let entries = load_partition(&path, &tool).await?;
            debug!(tool = %tool, entries = entries.len(), "Loaded partition");
            partitions.push(Partition::with_entries(tool, entries));
        }

        info!(
            dir = %dir.display(),
            partitions = partitions.len(),
            allow_backfill,
            "File history store opened"
        );

        Ok(Self {
            partitions: PartitionSet::from_partitions(partitions),
            sink: JsonFileSink { dir },
            allow_backfill,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.sink.dir
    }

    pub fn partition_path(&self, tool: &str) -> PathBuf {
        self.sink.partition_path(tool)
    }
}

async fn load_partition(path: &Path, tool: &str) -> StoreResult<Vec<Arc<Entry>>> {
    let bytes = fs::read(path).await?;
    let mut entries: Vec<Entry> =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptHistory {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(stray) = entries.iter().find(|e| e.tool != tool) {
        return Err(StoreError::CorruptHistory {
            tool: tool.to_string(),
            reason: format!("entry {} belongs to tool '{}'", stray.commit.id, stray.tool),
        });
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.commit.id.as_str()) {
            return Err(StoreError::CorruptHistory {
                tool: tool.to_string(),
                reason: format!("commit {} stored twice", entry.commit.id),
            });
        }
    }

    let ordered = entries
        .windows(2)
        .all(|pair| pair[0].order_key() <= pair[1].order_key());
    if !ordered {
        warn!(tool, "Partition file out of order, re-sorting on load");
        entries.sort_by_key(|e| e.order_key());
    }

    Ok(entries.into_iter().map(Arc::new).collect())
}

/// Map a tool name onto a portable file stem. Bytes outside `[A-Za-z0-9_-]`
/// become `%XX`.
pub fn encode_tool(tool: &str) -> String {
    let mut encoded = String::with_capacity(tool.len());
    for byte in tool.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

pub fn decode_tool(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    if decoded.is_empty() {
        return None;
    }
    String::from_utf8(decoded).ok()
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    #[tracing::instrument(level = "debug", skip(self, entry), fields(commit_id = %entry.commit.id))]
    async fn append(&self, tool: &str, entry: Entry) -> StoreResult<()> {
        let partition = self.partitions.get_or_create(tool).await;
        partition
            .append(entry, self.allow_backfill, &self.sink)
            .await
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
        "file"
    }

    fn allows_backfill(&self) -> bool {
        self.allow_backfill
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip_through_file_stems() {
        for tool in ["go", "js-bench", "customSmallerIsBetter", "pytest/unit", "ünï"] {
            let stem = encode_tool(tool);
            assert!(!stem.contains('/'));
            assert!(!stem.contains('.'));
            assert_eq!(decode_tool(&stem).as_deref(), Some(tool));
        }
    }

    #[test]
    fn test_decode_rejects_truncated_escape() {
        assert_eq!(decode_tool("go%2"), None);
        assert_eq!(decode_tool(""), None);
    }
}
