//! Application services - Object cache and lifecycle hooks

mod lifecycle_hooks;
mod object_cache_service;

pub use lifecycle_hooks::InvalidationObserver;
pub use object_cache_service::ObjectCache;
