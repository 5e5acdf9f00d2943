//! Background invalidation job contract

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Default scan batch size for background jobs
pub const BACKGROUND_BLOCK_SIZE: usize = 1000;

/// Default scan batch size for synchronous invalidation
pub const SYNC_BLOCK_SIZE: usize = 100;

/// A queued pattern invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationJob {
    pub id: Uuid,
    pub pattern: String,
    pub block_size: usize,
    pub enqueued_at: DateTime<Utc>,
}

impl InvalidationJob {
    pub fn new(pattern: impl Into<String>, block_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern: pattern.into(),
            block_size,
            enqueued_at: Utc::now(),
        }
    }

    /// Time elapsed since the job was enqueued; zero if the clock went backwards
    pub fn queued_for(&self) -> std::time::Duration {
        (Utc::now() - self.enqueued_at).to_std().unwrap_or_default()
    }
}

/// Outcome of a background invalidation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// The guard was absent; one job was enqueued
    Scheduled,
    /// A job for the same pattern is queued, running, or its guard has not expired
    AlreadyScheduled,
}

impl ScheduleOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

impl fmt::Display for ScheduleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleOutcome::Scheduled => write!(f, "scheduled"),
            ScheduleOutcome::AlreadyScheduled => write!(f, "already scheduled"),
        }
    }
}

/// How an entity mutation invalidates its cache scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationMode {
    /// Deduplicated background job
    #[default]
    Async,
    /// Scan-delete before returning
    Sync,
}

/// Hands invalidation jobs to a worker runtime
///
/// `enqueue` must not wait for the job to run.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InvalidationQueue: Send + Sync {
    async fn enqueue(&self, job: InvalidationJob) -> Result<(), DomainError>;
}
