//! Redis store implementation

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};

use crate::domain::DomainError;
use crate::domain::cache::{CacheStore, ScanPage};

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
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
}

/// Redis store implementation
///
/// Features:
/// - Hash containers (HGET, HGETALL, HSET, HDEL)
/// - Atomic SET NX EX for invalidation guards
/// - Cursor-based SCAN, never KEYS
/// - Connection multiplexing via ConnectionManager
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Creates a new Redis store connection
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::configuration(format!("Failed to create Redis client: {}", e))
        })?;

        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout);

        let connection = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| DomainError::store(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis store with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match &self.config.key_prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::to_string)
                .unwrap_or(key),
            None => key,
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn.hget(&prefixed_key, field).await.map_err(|e| {
            DomainError::store(format!("Failed to get field '{}' of '{}': {}", field, key, e))
        })?;

        Ok(result)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: HashMap<String, String> = conn
            .hgetall(&prefixed_key)
            .await
            .map_err(|e| DomainError::store(format!("Failed to get fields of '{}': {}", key, e)))?;

        Ok(result)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let _: () = conn.hset(&prefixed_key, field, value).await.map_err(|e| {
            DomainError::store(format!("Failed to set field '{}' of '{}': {}", field, key, e))
        })?;

        Ok(())
    }

    async fn hset_multiple(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), DomainError> {
        if fields.is_empty() {
            return Ok(());
        }

        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let _: () = conn
            .hset_multiple(&prefixed_key, fields)
            .await
            .map_err(|e| DomainError::store(format!("Failed to set fields of '{}': {}", key, e)))?;

        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(&prefixed_key)
            .await
            .map_err(|e| DomainError::store(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize, DomainError> {
        if fields.is_empty() {
            return Ok(0);
        }

        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let removed: usize = conn.hdel(&prefixed_key, fields).await.map_err(|e| {
            DomainError::store(format!("Failed to delete fields of '{}': {}", key, e))
        })?;

        Ok(removed)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1);

        // Use SET NX EX for atomic set-if-not-exists with TTL
        let result: Option<String> = redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::store(format!("Failed to set_nx key '{}': {}", key, e)))?;

        // Redis returns "OK" if set, None if key existed
        Ok(result.is_some())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, DomainError> {
        let prefixed_pattern = self.prefix_key(pattern);
        let mut conn = self.connection.clone();

        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&prefixed_pattern)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::store(format!(
                    "Failed to scan keys with pattern '{}': {}",
                    pattern, e
                ))
            })?;

        let keys = keys.into_iter().map(|k| self.strip_prefix(k)).collect();

        Ok(ScanPage::new(next_cursor, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: cargo test -- --ignored

    fn get_test_config() -> RedisStoreConfig {
        RedisStoreConfig::new("redis://127.0.0.1:6379").with_key_prefix("multicache-test")
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_hset_and_hget() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        store.hset("obj", "summary", "{}").await.unwrap();

        let result = store.hget("obj", "summary").await.unwrap();
        assert_eq!(result, Some("{}".to_string()));

        // Cleanup
        store.del("obj").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_nx_ex() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        // First set should succeed
        let result = store
            .set_nx_ex("nx_key", "unprocessed", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(result);

        // Second set should fail
        let result = store
            .set_nx_ex("nx_key", "unprocessed", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!result);

        // Cleanup
        store.del("nx_key").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_scan_strips_prefix() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        store.hset("scan:1", "f", "v").await.unwrap();

        let mut cursor = 0;
        let mut found = Vec::new();
        loop {
            let page = store.scan(cursor, "scan:*", 100).await.unwrap();
            found.extend(page.keys.iter().cloned());
            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }
        assert_eq!(found, vec!["scan:1".to_string()]);

        // Cleanup
        store.del("scan:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = RedisStore::with_url("not a url").await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_key_prefix() {
        let config = RedisStoreConfig::new("redis://localhost").with_key_prefix("myapp");

        assert_eq!(config.key_prefix, Some("myapp".to_string()));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }
}
