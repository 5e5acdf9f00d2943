use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Committed entity mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Saved,
    Destroyed,
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEventKind::Saved => write!(f, "saved"),
            LifecycleEventKind::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Event emitted by the entity layer after a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub type_name: String,
    pub id: String,
}

impl LifecycleEvent {
    pub fn saved(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: LifecycleEventKind::Saved,
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    pub fn destroyed(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: LifecycleEventKind::Destroyed,
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Subscriber notified of entity mutations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), DomainError>;
}
