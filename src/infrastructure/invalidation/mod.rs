//! Invalidation infrastructure - Scan-delete, engine and background workers

mod blocking;
mod engine;
mod worker;

pub use blocking::{validate_pattern, BlockingInvalidator};
pub use engine::{InvalidationConfig, InvalidationEngine, InvalidationOutcome};
pub use worker::{WorkerPool, WorkerPoolConfig, WorkerPoolQueue};
