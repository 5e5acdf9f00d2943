//! Key-value store protocol required by the cache layer

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Result of one cursor scan step
///
/// A `cursor` of 0 means the iteration is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn new(cursor: u64, keys: Vec<String>) -> Self {
        Self { cursor, keys }
    }

    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// The store operations used by the read/write path and invalidation engine
///
/// Container keys are hashes: one field per cached category. Every failure to
/// talk to the backend surfaces as `DomainError::StoreUnavailable`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Reads one field of a hash container
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError>;

    /// Reads every field of a hash container (empty map if the key is absent)
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, DomainError>;

    /// Writes one field of a hash container
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError>;

    /// Writes several fields of a hash container in one round-trip
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)])
    -> Result<(), DomainError>;

    /// Deletes a key of any type, returning whether it existed
    async fn del(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes fields of a hash container, returning how many were removed
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize, DomainError>;

    /// Sets a string key only if it does not exist, with an expiry
    ///
    /// Returns true when the key was set. Must be atomic in the backend.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// One step of a resumable, non-blocking key-space scan
    ///
    /// `count` is a hint for how many keys the backend examines per step.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize)
    -> Result<ScanPage, DomainError>;
}
