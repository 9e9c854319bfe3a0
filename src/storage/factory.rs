use std::sync::Arc;
use tracing::info;

use crate::storage::{
    FileHistoryStore, HistoryStore, MemoryHistoryStore, StoreConfig, StoreError, StoreMode,
    StoreResult,
};

/// Factory for creating history stores based on configuration
pub struct StoreFactory;

impl StoreFactory {
    /// Create a history store based on the configuration
    pub async fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn HistoryStore>> {
        Self::validate_config(config)?;

        match config.mode {
            StoreMode::Memory => {
                info!(allow_backfill = config.allow_backfill, "Creating memory history store");
                Ok(Arc::new(MemoryHistoryStore::with_backfill(
                    config.allow_backfill,
                )))
            }
            StoreMode::File => {
                let dir = config.data_dir.as_ref().ok_or_else(|| {
                    StoreError::ConfigurationError("File store requires data_dir".to_string())
                })?;

                info!(dir = %dir.display(), "Creating file history store");
                let store = FileHistoryStore::open(dir.clone(), config.allow_backfill).await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Validate storage configuration
    pub fn validate_config(config: &StoreConfig) -> StoreResult<()> {
        if config.mode == StoreMode::File {
            match &config.data_dir {
                None => {
                    return Err(StoreError::ConfigurationError(
                        "File mode selected but no data_dir provided".to_string(),
                    ));
                }
                Some(dir) if dir.as_os_str().is_empty() => {
                    return Err(StoreError::ConfigurationError(
                        "data_dir must not be empty".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        if config.append_timeout_ms == Some(0) {
            return Err(StoreError::ConfigurationError(
                "Append timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_requires_data_dir() {
        let config = StoreConfig {
            data_dir: None,
            ..StoreConfig::default()
        };
        assert!(matches!(
            StoreFactory::validate_config(&config),
            Err(StoreError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = StoreConfig {
            append_timeout_ms: Some(0),
            ..StoreConfig::in_memory()
        };
        assert!(StoreFactory::validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_memory_store_created() {
        let store = StoreFactory::create_store(&StoreConfig::in_memory())
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(!store.allows_backfill());
    }
}
