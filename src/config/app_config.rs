use std::time::Duration;

use serde::Deserialize;

use crate::domain::invalidation::{BACKGROUND_BLOCK_SIZE, SYNC_BLOCK_SIZE};
use crate::domain::DomainError;
use crate::infrastructure::invalidation::{InvalidationConfig, WorkerPoolConfig};
use crate::infrastructure::store::StoreConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub invalidation: InvalidationSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `memory` or a `redis://` URL
    pub locator: String,
    pub key_prefix: Option<String>,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvalidationSettings {
    pub sync_block_size: usize,
    pub background_block_size: usize,
    pub guard_ttl_secs: u64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            locator: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout_secs: 5,
        }
    }
}

impl Default for InvalidationSettings {
    fn default() -> Self {
        Self {
            sync_block_size: SYNC_BLOCK_SIZE,
            background_block_size: BACKGROUND_BLOCK_SIZE,
            guard_ttl_secs: 30 * 24 * 60 * 60,
            workers: 2,
            queue_capacity: 1024,
            max_attempts: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl StoreSettings {
    /// Builds the store configuration from the locator and options
    pub fn to_store_config(&self) -> Result<StoreConfig, DomainError> {
        let mut config = StoreConfig::from_locator(&self.locator)?
            .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs));

        if let Some(prefix) = self.key_prefix.as_ref().filter(|p| !p.is_empty()) {
            config = config.with_key_prefix(prefix.clone());
        }

        Ok(config)
    }
}

impl InvalidationSettings {
    pub fn to_invalidation_config(&self) -> InvalidationConfig {
        InvalidationConfig::default()
            .with_sync_block_size(self.sync_block_size)
            .with_background_block_size(self.background_block_size)
            .with_guard_ttl(Duration::from_secs(self.guard_ttl_secs))
    }

    pub fn to_worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::default()
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_max_attempts(self.max_attempts)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("MULTICACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::StoreType;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.invalidation.sync_block_size, 100);
        assert_eq!(config.invalidation.background_block_size, 1000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_store_settings_to_config() {
        let settings = StoreSettings {
            locator: "memory".to_string(),
            key_prefix: Some("app".to_string()),
            connection_timeout_secs: 2,
        };

        let config = settings.to_store_config().unwrap();

        assert_eq!(config.store_type, StoreType::InMemory);
        assert_eq!(config.key_prefix, Some("app".to_string()));
        assert_eq!(config.connection_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_locator() {
        let settings = StoreSettings {
            locator: "ftp://nope".to_string(),
            ..Default::default()
        };

        assert!(settings.to_store_config().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "store": { "locator": "memory" },
            "invalidation": { "workers": 4 },
            "logging": { "format": "json" }
        }))
        .unwrap();

        assert_eq!(config.store.locator, "memory");
        assert_eq!(config.invalidation.workers, 4);
        assert_eq!(config.invalidation.max_attempts, 3);
        assert_eq!(config.logging.format, LogFormat::Json);

        let pool = config.invalidation.to_worker_pool_config();
        assert_eq!(pool.workers, 4);
    }
}
