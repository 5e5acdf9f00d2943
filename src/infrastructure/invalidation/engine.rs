//! Invalidation engine: synchronous scan-delete plus deduplicated background jobs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::DomainError;
use crate::domain::cache::{KeyScope, guard_key, object_key};
use crate::domain::invalidation::{
    BACKGROUND_BLOCK_SIZE, InvalidationJob, InvalidationMode, InvalidationQueue, SYNC_BLOCK_SIZE,
    ScheduleOutcome,
};
use crate::infrastructure::observability::record_invalidation_request;
use crate::infrastructure::store::StoreAccessor;

use super::blocking::{BlockingInvalidator, validate_pattern};

/// Value stored under a guard key while its job is pending
const GUARD_VALUE: &str = "unprocessed";

/// Configuration for the invalidation engine
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationConfig {
    /// Scan batch size for synchronous invalidation
    pub sync_block_size: usize,
    /// Scan batch size for background jobs
    pub background_block_size: usize,
    /// Lifetime of a deduplication guard
    pub guard_ttl: Duration,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            sync_block_size: SYNC_BLOCK_SIZE,
            background_block_size: BACKGROUND_BLOCK_SIZE,
            guard_ttl: Duration::from_secs(30 * 24 * 60 * 60), // 1 month
        }
    }
}

impl InvalidationConfig {
    /// Sets the synchronous batch size
    pub fn with_sync_block_size(mut self, size: usize) -> Self {
        self.sync_block_size = size;
        self
    }

    /// Sets the background batch size
    pub fn with_background_block_size(mut self, size: usize) -> Self {
        self.background_block_size = size;
        self
    }

    /// Sets the guard TTL
    pub fn with_guard_ttl(mut self, ttl: Duration) -> Self {
        self.guard_ttl = ttl;
        self
    }
}

/// Result of invalidating a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Synchronous run finished, with the number of keys deleted
    Deleted(usize),
    /// Handed to the background queue
    Background(ScheduleOutcome),
}

/// Removes cache entries by key or key pattern
pub struct InvalidationEngine {
    accessor: Arc<StoreAccessor>,
    blocking: BlockingInvalidator,
    queue: Arc<dyn InvalidationQueue>,
    config: InvalidationConfig,
}

impl fmt::Debug for InvalidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationEngine")
            .field("accessor", &self.accessor)
            .field("queue", &"<InvalidationQueue>")
            .field("config", &self.config)
            .finish()
    }
}

impl InvalidationEngine {
    /// Creates a new engine with default configuration
    pub fn new(accessor: Arc<StoreAccessor>, queue: Arc<dyn InvalidationQueue>) -> Self {
        Self::with_config(accessor, queue, InvalidationConfig::default())
    }

    /// Creates a new engine with custom configuration
    pub fn with_config(
        accessor: Arc<StoreAccessor>,
        queue: Arc<dyn InvalidationQueue>,
        config: InvalidationConfig,
    ) -> Self {
        Self {
            blocking: BlockingInvalidator::new(accessor.clone()),
            accessor,
            queue,
            config,
        }
    }

    pub fn config(&self) -> &InvalidationConfig {
        &self.config
    }

    /// Deletes `pattern` literally, or every key matching it, before returning
    pub async fn invalidate_sync(
        &self,
        pattern: &str,
        exact_match: bool,
        block_size: usize,
    ) -> Result<usize, DomainError> {
        self.blocking
            .invalidate_sync(pattern, exact_match, block_size)
            .await
    }

    /// Schedules a background scan-delete of `pattern`, at most once per guard window
    #[instrument(skip(self))]
    pub async fn invalidate_async(&self, pattern: &str) -> Result<ScheduleOutcome, DomainError> {
        let pattern = validate_pattern(pattern)?;
        let store = self.accessor.get_store().await?;
        let guard = guard_key(pattern);

        let acquired = store
            .set_nx_ex(&guard, GUARD_VALUE, self.config.guard_ttl)
            .await?;

        if !acquired {
            info!(pattern, "Invalidation already scheduled");
            record_invalidation_request(ScheduleOutcome::AlreadyScheduled);
            return Ok(ScheduleOutcome::AlreadyScheduled);
        }

        let job = InvalidationJob::new(pattern, self.config.background_block_size);
        let job_id = job.id;

        if let Err(e) = self.queue.enqueue(job).await {
            warn!(pattern, error = %e, "Enqueue failed, releasing guard");
            // Release the guard so the pattern can be scheduled again
            if let Err(release_error) = store.del(&guard).await {
                warn!(pattern, error = %release_error, "Failed to release guard");
            }
            return Err(e);
        }

        info!(pattern, %job_id, "Invalidation scheduled");
        record_invalidation_request(ScheduleOutcome::Scheduled);
        Ok(ScheduleOutcome::Scheduled)
    }

    /// Executes a background job
    pub async fn perform(&self, job: &InvalidationJob) -> Result<usize, DomainError> {
        self.blocking.perform(job).await
    }

    /// Invalidates every key in `scope`
    pub async fn invalidate_scope(
        &self,
        scope: &KeyScope,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        match (scope, mode) {
            (KeyScope::Object { type_name, id }, InvalidationMode::Sync) => {
                let key = object_key(type_name, id)?;
                let deleted = self.invalidate_sync(&key, true, 1).await?;
                Ok(InvalidationOutcome::Deleted(deleted))
            }
            (_, InvalidationMode::Sync) => {
                let pattern = scope.pattern()?;
                let deleted = self
                    .invalidate_sync(&pattern, false, self.config.sync_block_size)
                    .await?;
                Ok(InvalidationOutcome::Deleted(deleted))
            }
            (_, InvalidationMode::Async) => {
                let pattern = scope.pattern()?;
                let outcome = self.invalidate_async(&pattern).await?;
                Ok(InvalidationOutcome::Background(outcome))
            }
        }
    }

    /// Invalidates every category of one object
    pub async fn destroy_obj_cache(
        &self,
        type_name: &str,
        id: &str,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.invalidate_scope(&KeyScope::for_object(type_name, id), mode)
            .await
    }

    /// Invalidates every object of one entity type
    pub async fn destroy_class_cache(
        &self,
        type_name: &str,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.invalidate_scope(&KeyScope::for_type(type_name), mode)
            .await
    }

    /// Invalidates every key under the master namespace
    pub async fn destroy_all(
        &self,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.invalidate_scope(&KeyScope::all(), mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheStore, MockCacheStore};
    use crate::domain::invalidation::MockInvalidationQueue;
    use crate::infrastructure::store::InMemoryStore;

    fn engine_with(store: Arc<dyn CacheStore>, queue: MockInvalidationQueue) -> InvalidationEngine {
        InvalidationEngine::new(
            Arc::new(StoreAccessor::with_store(store)),
            Arc::new(queue),
        )
    }

    #[tokio::test]
    async fn test_async_deduplicates_same_pattern() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| job.pattern == "MultiCache:Widget:*" && job.block_size == 1000)
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store, queue);

        let first = engine.invalidate_async("MultiCache:Widget:*").await.unwrap();
        let second = engine.invalidate_async("MultiCache:Widget:*").await.unwrap();

        assert_eq!(first, ScheduleOutcome::Scheduled);
        assert_eq!(second, ScheduleOutcome::AlreadyScheduled);
    }

    #[tokio::test]
    async fn test_async_distinct_patterns_both_scheduled() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue.expect_enqueue().times(2).returning(|_| Ok(()));

        let engine = engine_with(store, queue);

        assert!(
            engine
                .invalidate_async("MultiCache:Widget:*")
                .await
                .unwrap()
                .is_scheduled()
        );
        assert!(
            engine
                .invalidate_async("MultiCache:Gadget:*")
                .await
                .unwrap()
                .is_scheduled()
        );
    }

    #[tokio::test]
    async fn test_async_rescheduled_after_perform() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue.expect_enqueue().times(2).returning(|_| Ok(()));

        let engine = engine_with(store, queue);

        engine.invalidate_async("MultiCache:Widget:*").await.unwrap();
        engine
            .perform(&InvalidationJob::new("MultiCache:Widget:*", 1000))
            .await
            .unwrap();

        let again = engine.invalidate_async("MultiCache:Widget:*").await.unwrap();
        assert_eq!(again, ScheduleOutcome::Scheduled);
    }

    #[tokio::test]
    async fn test_async_enqueue_failure_releases_guard() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue
            .expect_enqueue()
            .times(1)
            .returning(|_| Err(DomainError::queue("worker pool stopped")));

        let engine = engine_with(store.clone(), queue);

        let result = engine.invalidate_async("MultiCache:Widget:*").await;
        assert!(matches!(result, Err(DomainError::Queue { .. })));

        let guard_free = store
            .set_nx_ex(
                &guard_key("MultiCache:Widget:*"),
                GUARD_VALUE,
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        assert!(guard_free);
    }

    #[tokio::test]
    async fn test_async_rejects_universal_pattern() {
        let mut queue = MockInvalidationQueue::new();
        queue.expect_enqueue().times(0);

        let engine = engine_with(Arc::new(MockCacheStore::new()), queue);

        let result = engine.invalidate_async("*").await;
        assert!(matches!(result, Err(DomainError::InvalidPattern { .. })));
    }

    #[tokio::test]
    async fn test_destroy_obj_cache_sync() {
        let store = Arc::new(InMemoryStore::new());
        store.hset("MultiCache:Widget:42", "summary", "{}").await.unwrap();
        store.hset("MultiCache:Widget:4", "summary", "{}").await.unwrap();

        let engine = engine_with(store.clone(), MockInvalidationQueue::new());

        let outcome = engine
            .destroy_obj_cache("Widget", "42", InvalidationMode::Sync)
            .await
            .unwrap();

        assert_eq!(outcome, InvalidationOutcome::Deleted(1));
        assert!(store.hget_all("MultiCache:Widget:42").await.unwrap().is_empty());
        assert!(!store.hget_all("MultiCache:Widget:4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_obj_cache_async_uses_literal_pattern() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| job.pattern == "MultiCache:Widget:42")
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store, queue);

        let outcome = engine
            .destroy_obj_cache("Widget", "42", InvalidationMode::Async)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            InvalidationOutcome::Background(ScheduleOutcome::Scheduled)
        );
    }

    #[tokio::test]
    async fn test_class_scope_leaves_other_types() {
        let store = Arc::new(InMemoryStore::new());
        for key in [
            "MultiCache:Widget:1",
            "MultiCache:Widget:2",
            "MultiCache:WidgetGroup:1",
            "MultiCache:Gadget:1",
        ] {
            store.hset(key, "summary", "{}").await.unwrap();
            store.hset(key, "stats", "{}").await.unwrap();
        }

        let engine = engine_with(store.clone(), MockInvalidationQueue::new());

        let outcome = engine
            .destroy_class_cache("Widget", InvalidationMode::Sync)
            .await
            .unwrap();

        assert_eq!(outcome, InvalidationOutcome::Deleted(2));
        assert!(!store.hget_all("MultiCache:WidgetGroup:1").await.unwrap().is_empty());
        assert!(!store.hget_all("MultiCache:Gadget:1").await.unwrap().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = InvalidationConfig::default();

        assert_eq!(config.sync_block_size, 100);
        assert_eq!(config.background_block_size, 1000);
        assert_eq!(config.guard_ttl, Duration::from_secs(2_592_000));
    }

    #[tokio::test]
    async fn test_destroy_all_keeps_pending_guards() {
        let store = Arc::new(InMemoryStore::new());
        store.hset("MultiCache:Widget:42", "summary", "{}").await.unwrap();

        let mut queue = MockInvalidationQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| job.pattern == "MultiCache:Widget:42")
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store, queue);

        let first = engine
            .destroy_obj_cache("Widget", "42", InvalidationMode::Async)
            .await
            .unwrap();
        assert_eq!(first, InvalidationOutcome::Background(ScheduleOutcome::Scheduled));

        let wiped = engine.destroy_all(InvalidationMode::Sync).await.unwrap();
        assert_eq!(wiped, InvalidationOutcome::Deleted(1));

        let second = engine
            .destroy_obj_cache("Widget", "42", InvalidationMode::Async)
            .await
            .unwrap();
        assert_eq!(
            second,
            InvalidationOutcome::Background(ScheduleOutcome::AlreadyScheduled)
        );
    }

    #[tokio::test]
    async fn test_reserved_type_scope_is_rejected() {
        let store = Arc::new(InMemoryStore::new());

        let mut queue = MockInvalidationQueue::new();
        queue.expect_enqueue().times(1).returning(|_| Ok(()));

        let engine = engine_with(store, queue);
        engine.invalidate_async("MultiCache:Widget:*").await.unwrap();

        let result = engine
            .destroy_class_cache("invalidation", InvalidationMode::Sync)
            .await;
        assert!(matches!(result, Err(DomainError::InvalidKey { .. })));

        let again = engine.invalidate_async("MultiCache:Widget:*").await.unwrap();
        assert_eq!(again, ScheduleOutcome::AlreadyScheduled);
    }
}
