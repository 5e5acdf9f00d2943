//! Binds entity save/destroy events to cache invalidation

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::invalidation::InvalidationMode;
use crate::domain::lifecycle::{LifecycleEvent, LifecycleObserver};
use crate::infrastructure::invalidation::InvalidationEngine;

/// Invalidates an object's whole cache scope whenever it is saved or destroyed
#[derive(Debug)]
pub struct InvalidationObserver {
    engine: Arc<InvalidationEngine>,
    mode: InvalidationMode,
}

impl InvalidationObserver {
    /// Creates an observer using the background path
    pub fn new(engine: Arc<InvalidationEngine>) -> Self {
        Self::with_mode(engine, InvalidationMode::Async)
    }

    /// Creates an observer with an explicit mode
    pub fn with_mode(engine: Arc<InvalidationEngine>, mode: InvalidationMode) -> Self {
        Self { engine, mode }
    }

    pub fn mode(&self) -> InvalidationMode {
        self.mode
    }
}

#[async_trait]
impl LifecycleObserver for InvalidationObserver {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), DomainError> {
        let outcome = self
            .engine
            .destroy_obj_cache(&event.type_name, &event.id, self.mode)
            .await?;

        debug!(
            kind = %event.kind,
            type_name = %event.type_name,
            id = %event.id,
            ?outcome,
            "Object cache invalidated"
        );

        Ok(())
    }
}
