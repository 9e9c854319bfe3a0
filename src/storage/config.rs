use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// History store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage backend
    pub mode: StoreMode,
    /// Directory holding one JSON file per tool (file mode)
    pub data_dir: Option<PathBuf>,
    /// Accept entries older than the partition maximum and insert them in order
    pub allow_backfill: bool,
    /// Upper bound on one durable append; unset means wait indefinitely
    pub append_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::File,
            data_dir: Some(PathBuf::from("./benchmark-data")),
            allow_backfill: false,
            append_timeout_ms: None,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            mode: StoreMode::Memory,
            data_dir: None,
            ..Default::default()
        }
    }

    pub fn file(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StoreMode::File,
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    pub fn append_timeout(&self) -> Option<Duration> {
        self.append_timeout_ms.map(Duration::from_millis)
    }
}

/// Storage backend modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreMode {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File,
}

impl std::str::FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreMode::Memory),
            "file" => Ok(StoreMode::File),
            other => Err(format!("unknown store mode '{}', expected memory or file", other)),
        }
    }
}

impl std::fmt::Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::Memory => f.write_str("memory"),
            StoreMode::File => f.write_str("file"),
        }
    }
}
