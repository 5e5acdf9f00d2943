//! Store factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use crate::domain::DomainError;
use crate::domain::cache::CacheStore;

use super::in_memory::{InMemoryStore, InMemoryStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported store types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreType {
    /// In-process store using moka
    #[default]
    InMemory,
    /// Redis server
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::InMemory => write!(f, "in_memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

/// Configuration resolved from a store locator
///
/// Locators: `memory`, `in_memory`, `memory://` for the in-process store;
/// `redis://...` or `rediss://...` URLs for Redis.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Type of store to create
    pub store_type: StoreType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout (Redis only)
    pub connection_timeout: Duration,
    /// Maximum number of keys (in-memory only)
    pub max_capacity: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::InMemory,
            redis_url: None,
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
            max_capacity: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration for the in-memory store
    pub fn in_memory() -> Self {
        Self {
            store_type: StoreType::InMemory,
            ..Default::default()
        }
    }

    /// Creates a new configuration for a Redis store
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Parses a store locator string
    pub fn from_locator(locator: &str) -> Result<Self, DomainError> {
        let locator = locator.trim();

        match locator.to_lowercase().as_str() {
            "" => Err(DomainError::configuration("Store locator can not be blank")),
            "memory" | "in_memory" | "inmemory" | "memory://" => Ok(Self::in_memory()),
            lower if lower.starts_with("redis://") || lower.starts_with("rediss://") => {
                Ok(Self::redis(locator))
            }
            _ => Err(DomainError::configuration(format!(
                "Unknown store locator: {}. Use 'memory' or a redis:// URL",
                locator
            ))),
        }
    }

    /// Returns the locator this configuration was built from
    pub fn locator(&self) -> String {
        match self.store_type {
            StoreType::InMemory => "memory".to_string(),
            StoreType::Redis => self.redis_url.clone().unwrap_or_default(),
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the maximum capacity (in-memory only)
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a new store factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a store instance based on configuration
    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn CacheStore>, DomainError> {
        match config.store_type {
            StoreType::InMemory => {
                let mut in_memory_config = InMemoryStoreConfig::default();

                if let Some(capacity) = config.max_capacity {
                    in_memory_config = in_memory_config.with_max_capacity(capacity);
                }

                Ok(Arc::new(InMemoryStore::with_config(in_memory_config)))
            }
            StoreType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis store type")
                })?;

                let mut redis_config = RedisStoreConfig::new(url)
                    .with_connection_timeout(config.connection_timeout);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let store = RedisStore::new(redis_config).await?;
                Ok(Arc::new(store))
            }
        }
    }
}
