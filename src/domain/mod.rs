//! Domain layer - Cache keys, store protocol, invalidation contract and lifecycle events

pub mod cache;
pub mod error;
pub mod invalidation;
pub mod lifecycle;

pub use error::DomainError;
