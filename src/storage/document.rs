//! Whole-repository benchmark document.
//!
//! Dashboards consume a single `BENCHMARK_DATA` object keyed by tool, often
//! shipped as `data.js` with a `window.BENCHMARK_DATA = ` prefix. Export takes
//! a snapshot per partition; import replays entries through the ingestion
//! pipeline so they are validated like any other entry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::models::Entry;
use crate::storage::{HistoryStore, StoreResult};

pub const DATA_JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkDataDocument {
    /// Epoch milliseconds of the export
    pub last_update: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub entries: BTreeMap<String, Vec<Entry>>,
}

impl BenchmarkDataDocument {
    /// Parse either plain JSON or the `data.js` form
    pub fn parse(text: &str) -> StoreResult<Self> {
        let trimmed = text.trim();
        let json = trimmed
            .strip_prefix(DATA_JS_PREFIX)
            .map(|rest| rest.trim_end().trim_end_matches(';'))
            .unwrap_or(trimmed);
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_data_js(&self) -> StoreResult<String> {
        Ok(format!("{}{}\n", DATA_JS_PREFIX, self.to_json_pretty()?))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Outcome of replaying a document through the ingestion pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub appended: usize,
    pub skipped_duplicates: usize,
    /// Entries rejected by validation, never stored
    pub skipped_invalid: usize,
}

/// Snapshot every partition into a document, keeping at most `max_items`
/// most recent entries per tool
pub async fn export_document(
    store: &dyn HistoryStore,
    repo_url: Option<String>,
    max_items: Option<usize>,
) -> StoreResult<BenchmarkDataDocument> {
    let mut entries = BTreeMap::new();
    for tool in store.tools().await? {
        let snapshot = store.entries(&tool).await?;
        let skip = match max_items {
            Some(max) => snapshot.len().saturating_sub(max),
            None => 0,
        };
        let list: Vec<Entry> = snapshot
            .iter()
            .skip(skip)
            .map(|e| e.as_ref().clone())
            .collect();
        entries.insert(tool, list);
    }

    let document = BenchmarkDataDocument {
        last_update: Utc::now().timestamp_millis(),
        repo_url,
        entries,
    };
    info!(
        tools = document.entries.len(),
        entries = document.entry_count(),
        "Exported benchmark data document"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1690000000000,
  "repoUrl": "https://github.com/example/web",
  "entries": {
    "Benchmark": [
      {
        "commit": { "id": "abc123", "message": "speed up router", "url": "https://github.com/example/web/commit/abc123" },
        "date": 1689999999000,
        "tool": "go",
        "benches": [
          { "name": "BenchmarkRouter", "value": 120.5, "unit": "ns/op", "extra": "10000000 times\n8 procs" }
        ]
      }
    ]
  }
};"#;

    #[test]
    fn test_parse_data_js() {
        let document = BenchmarkDataDocument::parse(SAMPLE).unwrap();
        assert_eq!(document.last_update, 1_690_000_000_000);
        assert_eq!(document.entry_count(), 1);
        let entry = &document.entries["Benchmark"][0];
        assert_eq!(entry.commit.id, "abc123");
        assert_eq!(entry.measurements[0].unit, "ns/op");
    }

    #[test]
    fn test_data_js_output_parses_back() {
        let document = BenchmarkDataDocument::parse(SAMPLE).unwrap();
        let js = document.to_data_js().unwrap();
        assert!(js.starts_with(DATA_JS_PREFIX));
        assert_eq!(BenchmarkDataDocument::parse(&js).unwrap(), document);
    }
}
