//! In-memory store implementation using moka
//!
//! Mirrors the subset of Redis semantics the cache layer relies on: hash
//! containers, atomic SET NX EX, and a resumable glob scan. Used by tests and
//! by the `memory` store locator.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use regex::Regex;

use crate::domain::DomainError;
use crate::domain::cache::{CacheStore, ScanPage};

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of top-level keys
    pub max_capacity: u64,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

impl InMemoryStoreConfig {
    /// Sets the maximum capacity
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

#[derive(Debug, Clone)]
enum StoreValue {
    Hash(HashMap<String, String>),
    Text(String),
}

/// Entry stored in moka
#[derive(Debug, Clone)]
struct StoreEntry {
    value: StoreValue,
    /// Expiration timestamp (millis since epoch)
    expires_at: Option<u64>,
}

/// Scan cursors kept open at once
const MAX_OPEN_CURSORS: usize = 1024;

/// Thread-safe in-memory store
#[derive(Debug)]
pub struct InMemoryStore {
    entries: MokaCache<String, StoreEntry>,
    /// Last key examined by each open scan cursor
    cursors: Mutex<HashMap<u64, String>>,
    next_cursor: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new in-memory store with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    /// Creates a new in-memory store with the given configuration
    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        Self {
            entries: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .build(),
            cursors: Mutex::new(HashMap::new()),
            next_cursor: AtomicU64::new(1),
        }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &StoreEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| Self::current_time_millis() > expires_at)
    }

    async fn live_entry(&self, key: &str) -> Option<StoreEntry> {
        let entry = self.entries.get(key).await?;

        if Self::is_expired(&entry) {
            self.entries.remove(key).await;
            return None;
        }

        Some(entry)
    }

    async fn live_hash(&self, key: &str) -> Result<Option<HashMap<String, String>>, DomainError> {
        match self.live_entry(key).await {
            Some(StoreEntry {
                value: StoreValue::Hash(fields),
                ..
            }) => Ok(Some(fields)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn upsert_fields(&self, key: &str, fields: Vec<(String, String)>) {
        self.entries
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let mut map = match existing.map(|e| e.into_value()) {
                    Some(entry) if !Self::is_expired(&entry) => match entry.value {
                        StoreValue::Hash(map) => map,
                        StoreValue::Text(_) => HashMap::new(),
                    },
                    _ => HashMap::new(),
                };

                map.extend(fields);

                std::future::ready(StoreEntry {
                    value: StoreValue::Hash(map),
                    expires_at: None,
                })
            })
            .await;
    }

    fn take_cursor(&self, cursor: u64) -> Result<Option<String>, DomainError> {
        if cursor == 0 {
            return Ok(None);
        }

        let mut cursors = self
            .cursors
            .lock()
            .map_err(|_| DomainError::store("Scan cursor table poisoned"))?;

        cursors
            .remove(&cursor)
            .map(Some)
            .ok_or_else(|| DomainError::store(format!("Unknown scan cursor {}", cursor)))
    }

    fn open_cursor(&self, last_key: String) -> Result<u64, DomainError> {
        let id = self.next_cursor.fetch_add(1, Ordering::Relaxed);

        let mut cursors = self
            .cursors
            .lock()
            .map_err(|_| DomainError::store("Scan cursor table poisoned"))?;

        // Abandoned scans never resume; evict the oldest cursor once full
        if cursors.len() >= MAX_OPEN_CURSORS {
            if let Some(oldest) = cursors.keys().min().copied() {
                cursors.remove(&oldest);
            }
        }

        cursors.insert(id, last_key);

        Ok(id)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str) -> DomainError {
    DomainError::store(format!(
        "WRONGTYPE Operation against key '{}' holding the wrong kind of value",
        key
    ))
}

/// Translates a Redis glob pattern into an anchored regex
pub(crate) fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let mut regex = String::from("^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                regex.push('[');
                for class_char in chars.by_ref() {
                    if class_char == ']' {
                        break;
                    }
                    if class_char == '\\' || class_char == '[' {
                        regex.push('\\');
                    }
                    regex.push(class_char);
                }
                regex.push(']');
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');

    Regex::new(&regex)
        .map_err(|e| DomainError::invalid_pattern(format!("Invalid pattern '{}': {}", pattern, e)))
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError> {
        Ok(self
            .live_hash(key)
            .await?
            .and_then(|mut fields| fields.remove(field)))
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        Ok(self.live_hash(key).await?.unwrap_or_default())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError> {
        if let Some(StoreEntry {
            value: StoreValue::Text(_),
            ..
        }) = self.live_entry(key).await
        {
            return Err(wrong_type(key));
        }

        self.upsert_fields(key, vec![(field.to_string(), value.to_string())])
            .await;
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

        if let Some(StoreEntry {
            value: StoreValue::Text(_),
            ..
        }) = self.live_entry(key).await
        {
            return Err(wrong_type(key));
        }

        self.upsert_fields(key, fields.to_vec()).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.live_entry(key).await.is_some();
        self.entries.remove(key).await;
        Ok(existed)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize, DomainError> {
        let Some(mut map) = self.live_hash(key).await? else {
            return Ok(0);
        };

        let removed = fields.iter().filter(|f| map.remove(*f).is_some()).count();

        if map.is_empty() {
            self.entries.remove(key).await;
        } else {
            self.entries
                .insert(
                    key.to_string(),
                    StoreEntry {
                        value: StoreValue::Hash(map),
                        expires_at: None,
                    },
                )
                .await;
        }

        Ok(removed)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        // Drop an expired holder so the insert below can win
        self.live_entry(key).await;

        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let expires_at = Self::current_time_millis().saturating_add(ttl_millis);
        let entry = StoreEntry {
            value: StoreValue::Text(value.to_string()),
            expires_at: Some(expires_at),
        };

        let result = self
            .entries
            .entry(key.to_string())
            .or_insert_with(std::future::ready(entry))
            .await;

        Ok(result.is_fresh())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, DomainError> {
        let regex = glob_to_regex(pattern)?;
        let after = self.take_cursor(cursor)?;

        self.entries.run_pending_tasks().await;

        // Use blocking task to iterate over store entries
        let entries = self.entries.clone();
        let mut keys: Vec<String> = tokio::task::spawn_blocking(move || {
            entries
                .iter()
                .filter(|(_, entry)| !Self::is_expired(entry))
                .map(|(k, _)| (*k).clone())
                .collect()
        })
        .await
        .map_err(|e| DomainError::store(format!("Failed to iterate store: {}", e)))?;

        keys.sort();

        let start = match &after {
            Some(last) => keys.partition_point(|k| k <= last),
            None => 0,
        };
        let end = (start + count.max(1)).min(keys.len());
        let examined = &keys[start..end];

        let matched = examined
            .iter()
            .filter(|k| regex.is_match(k))
            .cloned()
            .collect();

        let next_cursor = match examined.last() {
            Some(last) if end < keys.len() => self.open_cursor(last.clone())?,
            _ => 0,
        };

        Ok(ScanPage::new(next_cursor, matched))
    }
}
