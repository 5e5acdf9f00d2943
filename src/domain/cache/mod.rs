//! Cache domain - Key model, store protocol and entity contract

mod entity;
mod key;
mod store;

pub use entity::{CachedContent, EntityCacheDescriptor, EntityTarget, Identifiable};
pub use key::{
    entity_prefix, escape_glob, guard_key, is_guard_key, object_key, KeyScope,
    CACHE_KEY_MASTER_PREFIX, CACHE_KEY_SEPARATOR, INVALIDATION_NAMESPACE,
};
pub use store::{CacheStore, ScanPage};

#[cfg(test)]
pub use store::MockCacheStore;
