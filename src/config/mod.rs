//! Application configuration: defaults, then an optional YAML file, then
//! `BENCHTRAIL_*` environment overrides.

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::detection::DetectionConfig;
use crate::storage::{StoreConfig, StoreMode};

pub const ENV_DATA_DIR: &str = "BENCHTRAIL_DATA_DIR";
pub const ENV_STORE: &str = "BENCHTRAIL_STORE";
pub const ENV_ALLOW_BACKFILL: &str = "BENCHTRAIL_ALLOW_BACKFILL";
pub const ENV_WINDOW_SIZE: &str = "BENCHTRAIL_WINDOW_SIZE";
pub const ENV_THRESHOLD: &str = "BENCHTRAIL_THRESHOLD";
pub const ENV_HOST: &str = "BENCHTRAIL_HOST";
pub const ENV_PORT: &str = "BENCHTRAIL_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid YAML config: {0}")]
    Parse(String),

    #[error("Invalid {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    pub server: ServerConfig,
    pub storage: StoreConfig,
    pub detection: DetectionConfig,
}

impl AppConfiguration {
    /// Load the full configuration. A `.env` file, when present, feeds the
    /// environment before overrides are read.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenv() {
            Ok(_) => info!("✅ Loaded .env file"),
            Err(_) => debug!("No .env file found, using system environment variables"),
        }

        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| env::var(var).ok())?;
        config.validate()?;

        info!(
            store = %config.storage.mode,
            window_size = config.detection.window_size,
            threshold = config.detection.threshold,
            "📋 Configuration loaded successfully"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), "📁 Configuration loaded from file");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_STORE) {
            self.storage.mode = mode
                .parse::<StoreMode>()
                .map_err(|e| invalid_env(ENV_STORE, e))?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(flag) = lookup(ENV_ALLOW_BACKFILL) {
            self.storage.allow_backfill = parse_bool(&flag)
                .ok_or_else(|| invalid_env(ENV_ALLOW_BACKFILL, format!("'{}' is not a boolean", flag)))?;
        }
        if let Some(size) = lookup(ENV_WINDOW_SIZE) {
            self.detection.window_size = size
                .parse()
                .map_err(|e| invalid_env(ENV_WINDOW_SIZE, e))?;
        }
        if let Some(threshold) = lookup(ENV_THRESHOLD) {
            self.detection.threshold = threshold
                .parse()
                .map_err(|e| invalid_env(ENV_THRESHOLD, e))?;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.parse().map_err(|e| invalid_env(ENV_PORT, e))?;
        }

        debug!("🔧 Configuration loaded from environment variables");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("Invalid server port".to_string()));
        }
        crate::storage::StoreFactory::validate_config(&self.storage)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.detection.validate().map_err(ConfigError::Invalid)?;

        debug!("✅ Configuration validation passed");
        Ok(())
    }
}

fn invalid_env(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection.window_size, 5);
        assert_eq!(config.storage.mode, StoreMode::File);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = AppConfiguration::from_yaml_str(
            r#"
server:
  port: 9090
storage:
  mode: memory
detection:
  window_size: 3
  threshold: 0.05
  thresholds:
    BenchmarkNoisy-8: 0.25
  directions:
    tools:
      throughput: higher_is_better
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.mode, StoreMode::Memory);
        assert_eq!(config.detection.window_size, 3);
        assert_eq!(config.detection.threshold_for("BenchmarkNoisy-8"), 0.25);
        assert_eq!(
            config.detection.direction_for("throughput", "anything"),
            Direction::HigherIsBetter
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfiguration::default();
        config
            .apply_env(env_of(&[
                (ENV_STORE, "memory"),
                (ENV_ALLOW_BACKFILL, "true"),
                (ENV_WINDOW_SIZE, "8"),
                (ENV_THRESHOLD, "0.2"),
                (ENV_PORT, "3000"),
            ]))
            .unwrap();

        assert_eq!(config.storage.mode, StoreMode::Memory);
        assert!(config.storage.allow_backfill);
        assert_eq!(config.detection.window_size, 8);
        assert_eq!(config.detection.threshold, 0.2);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_bad_env_values() {
        let mut config = AppConfiguration::default();
        let err = config
            .apply_env(env_of(&[(ENV_WINDOW_SIZE, "five")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == ENV_WINDOW_SIZE));

        let err = config
            .apply_env(env_of(&[(ENV_ALLOW_BACKFILL, "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ALLOW_BACKFILL));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfiguration::default();
        config.detection.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfiguration::default();
        config.detection.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfiguration::default();
        config.storage.data_dir = None;
        assert!(config.validate().is_err());

        let mut config = AppConfiguration::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
