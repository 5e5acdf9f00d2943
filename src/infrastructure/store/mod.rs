//! Store infrastructure - Key-value store implementations and accessor

mod accessor;
mod factory;
mod in_memory;
mod redis;

pub use accessor::StoreAccessor;
pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use in_memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
