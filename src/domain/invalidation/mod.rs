//! Invalidation domain - Background job contract and scheduling outcomes

mod job;

pub use job::{
    InvalidationJob, InvalidationMode, InvalidationQueue, ScheduleOutcome, BACKGROUND_BLOCK_SIZE,
    SYNC_BLOCK_SIZE,
};

#[cfg(test)]
pub use job::MockInvalidationQueue;
