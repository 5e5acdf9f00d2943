//! MultiCache
//!
//! Per-object, per-category content cache over Redis:
//! - Get-or-compute reads keyed by entity type, id and category
//! - Synchronous and background (deduplicated) invalidation by key pattern
//! - Lifecycle hooks that drop an object's cache when it is saved or destroyed

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use domain::DomainError;
use domain::cache::EntityCacheDescriptor;
use domain::invalidation::InvalidationMode;
use domain::lifecycle::{LifecycleEvent, LifecycleHub};
use infrastructure::invalidation::{
    BlockingInvalidator, InvalidationConfig, InvalidationEngine, InvalidationOutcome, WorkerPool,
    WorkerPoolConfig,
};
use infrastructure::services::{InvalidationObserver, ObjectCache};
use infrastructure::store::{StoreAccessor, StoreConfig};

/// Entry point wiring the store accessor, invalidation engine, worker pool and lifecycle hub
pub struct MultiCache {
    accessor: Arc<StoreAccessor>,
    engine: Arc<InvalidationEngine>,
    lifecycle: Arc<LifecycleHub>,
    workers: WorkerPool,
}

impl std::fmt::Debug for MultiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCache")
            .field("accessor", &self.accessor)
            .field("workers", &self.workers)
            .finish()
    }
}

impl MultiCache {
    /// Builds the cache from loaded application configuration
    ///
    /// Must be called inside a tokio runtime; the worker pool is spawned here.
    pub fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let store_config = config.store.to_store_config()?;

        Ok(Self::new(
            Arc::new(StoreAccessor::with_config(store_config)),
            config.invalidation.to_invalidation_config(),
            config.invalidation.to_worker_pool_config(),
        ))
    }

    /// Builds the cache around an accessor, configured or not
    pub fn new(
        accessor: Arc<StoreAccessor>,
        invalidation: InvalidationConfig,
        workers: WorkerPoolConfig,
    ) -> Self {
        let workers = WorkerPool::start(BlockingInvalidator::new(accessor.clone()), workers);
        let engine = Arc::new(InvalidationEngine::with_config(
            accessor.clone(),
            workers.queue(),
            invalidation,
        ));

        Self {
            accessor,
            engine,
            lifecycle: Arc::new(LifecycleHub::new()),
            workers,
        }
    }

    /// Sets the store location; fails if a different one was already set
    pub fn configure(&self, config: StoreConfig) -> Result<(), DomainError> {
        self.accessor.configure(config)
    }

    pub fn accessor(&self) -> &Arc<StoreAccessor> {
        &self.accessor
    }

    pub fn engine(&self) -> &Arc<InvalidationEngine> {
        &self.engine
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleHub> {
        &self.lifecycle
    }

    /// Registers an entity type and hooks its lifecycle events to background invalidation
    pub fn register<D: EntityCacheDescriptor>(&self, descriptor: D) -> ObjectCache<D> {
        self.register_with_mode(descriptor, InvalidationMode::Async)
    }

    /// Same as `register`, with an explicit invalidation mode for lifecycle events
    pub fn register_with_mode<D: EntityCacheDescriptor>(
        &self,
        descriptor: D,
        mode: InvalidationMode,
    ) -> ObjectCache<D> {
        let descriptor = Arc::new(descriptor);
        let type_name = descriptor.type_name().to_string();

        self.lifecycle.subscribe(
            type_name.clone(),
            Arc::new(InvalidationObserver::with_mode(self.engine.clone(), mode)),
        );
        info!(type_name = %type_name, ?mode, "Registered cached entity type");

        ObjectCache::new(descriptor, self.accessor.clone(), self.engine.clone())
    }

    /// Dispatches an entity lifecycle event to the registered observers
    pub async fn emit(&self, event: LifecycleEvent) -> Result<(), DomainError> {
        self.lifecycle.emit(event).await
    }

    /// Invalidates every object of one entity type
    pub async fn destroy_class_cache(
        &self,
        type_name: &str,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.engine.destroy_class_cache(type_name, mode).await
    }

    /// Invalidates the whole namespace
    pub async fn destroy_all(
        &self,
        mode: InvalidationMode,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.engine.destroy_all(mode).await
    }

    /// Stops the worker pool after queued jobs have run
    pub async fn shutdown(self) {
        self.workers.shutdown().await;
    }
}
