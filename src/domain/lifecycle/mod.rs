//! Lifecycle domain - Entity mutation events and their subscribers
//!
//! The entity layer emits `LifecycleEvent`s after a save or destroy commits.
//! The cache layer subscribes observers that invalidate the affected scope.

mod event;
mod hub;

pub use event::{LifecycleEvent, LifecycleEventKind, LifecycleObserver};
pub use hub::LifecycleHub;

#[cfg(test)]
pub use event::MockLifecycleObserver;
