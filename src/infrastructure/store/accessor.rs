//! Store client accessor
//!
//! Holds the store locator recorded at start-up and resolves the store handle
//! once, on first use. Every later call returns the memoized handle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::info;

use crate::domain::DomainError;
use crate::domain::cache::CacheStore;

use super::factory::{StoreConfig, StoreFactory};

/// Lazily resolved, shared store handle
pub struct StoreAccessor {
    config: OnceLock<StoreConfig>,
    store: OnceCell<Arc<dyn CacheStore>>,
    factory: StoreFactory,
}

impl fmt::Debug for StoreAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAccessor")
            .field("config", &self.config.get())
            .field("resolved", &self.store.initialized())
            .finish()
    }
}

impl Default for StoreAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreAccessor {
    /// Creates an unconfigured accessor
    pub fn new() -> Self {
        Self {
            config: OnceLock::new(),
            store: OnceCell::new(),
            factory: StoreFactory::new(),
        }
    }

    /// Creates an accessor already configured with `config`
    pub fn with_config(config: StoreConfig) -> Self {
        let accessor = Self::new();
        let _ = accessor.config.set(config);
        accessor
    }

    /// Creates an accessor around an already resolved store handle
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        let accessor = Self::new();
        let _ = accessor.store.set(store);
        accessor
    }

    /// Records the store locator; call once at start-up
    ///
    /// Reconfiguring with the same locator is a no-op; a different one is rejected.
    pub fn configure(&self, config: StoreConfig) -> Result<(), DomainError> {
        match self.config.get() {
            Some(existing) if *existing == config => Ok(()),
            Some(existing) => Err(DomainError::configuration(format!(
                "Store already configured with '{}'",
                existing.locator()
            ))),
            None => {
                info!(store_type = %config.store_type, "Store configured");
                self.config.set(config).map_err(|_| {
                    DomainError::configuration("Store configured concurrently")
                })
            }
        }
    }

    /// Returns true once a locator has been recorded or a handle injected
    pub fn is_configured(&self) -> bool {
        self.config.get().is_some() || self.store.initialized()
    }

    /// Returns the shared store handle, resolving it on first use
    pub async fn get_store(&self) -> Result<Arc<dyn CacheStore>, DomainError> {
        if let Some(store) = self.store.get() {
            return Ok(store.clone());
        }

        let config = self.config.get().ok_or_else(|| {
            DomainError::not_configured("StoreAccessor::configure must be called before use")
        })?;

        let store = self
            .store
            .get_or_try_init(|| async {
                info!(store_type = %config.store_type, "Resolving store handle");
                self.factory.create(config).await
            })
            .await?;

        Ok(store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::InMemoryStore;

    #[tokio::test]
    async fn test_get_store_before_configure() {
        let accessor = StoreAccessor::new();

        assert!(!accessor.is_configured());
        let result = accessor.get_store().await;
        assert!(matches!(result, Err(DomainError::NotConfigured { .. })));
    }

    #[tokio::test]
    async fn test_get_store_is_memoized() {
        let accessor = StoreAccessor::new();
        accessor.configure(StoreConfig::in_memory()).unwrap();

        let first = accessor.get_store().await.unwrap();
        let second = accessor.get_store().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_with_store() {
        let store: Arc<dyn CacheStore> = Arc::new(InMemoryStore::new());
        let accessor = StoreAccessor::with_store(store.clone());

        assert!(accessor.is_configured());
        let resolved = accessor.get_store().await.unwrap();
        assert!(Arc::ptr_eq(&store, &resolved));
    }

    #[test]
    fn test_configure_twice() {
        let accessor = StoreAccessor::new();

        accessor.configure(StoreConfig::in_memory()).unwrap();
        accessor.configure(StoreConfig::in_memory()).unwrap();

        let result = accessor.configure(StoreConfig::redis("redis://localhost"));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_configure_then_resolve_blocking() {
        let accessor = StoreAccessor::with_config(StoreConfig::from_locator("memory").unwrap());

        let store = tokio_test::block_on(accessor.get_store());
        assert!(store.is_ok());
    }
}
