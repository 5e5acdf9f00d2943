use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::domain::DomainError;

use super::event::{LifecycleEvent, LifecycleObserver};

struct Subscription {
    /// None subscribes to every entity type
    type_name: Option<String>,
    observer: Arc<dyn LifecycleObserver>,
}

/// Fans lifecycle events out to the observers subscribed to their entity type
#[derive(Default)]
pub struct LifecycleHub {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl fmt::Debug for LifecycleHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.subscriptions.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("LifecycleHub")
            .field("subscriptions", &count)
            .finish()
    }
}

impl LifecycleHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `observer` to events for one entity type
    pub fn subscribe(&self, type_name: impl Into<String>, observer: Arc<dyn LifecycleObserver>) {
        self.push(Subscription {
            type_name: Some(type_name.into()),
            observer,
        });
    }

    /// Subscribes `observer` to events for every entity type
    pub fn subscribe_all(&self, observer: Arc<dyn LifecycleObserver>) {
        self.push(Subscription {
            type_name: None,
            observer,
        });
    }

    fn push(&self, subscription: Subscription) {
        match self.subscriptions.write() {
            Ok(mut subscriptions) => subscriptions.push(subscription),
            Err(poisoned) => poisoned.into_inner().push(subscription),
        }
    }

    fn observers_for(&self, type_name: &str) -> Vec<Arc<dyn LifecycleObserver>> {
        let subscriptions = match self.subscriptions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        subscriptions
            .iter()
            .filter(|s| s.type_name.as_deref().is_none_or(|t| t == type_name))
            .map(|s| s.observer.clone())
            .collect()
    }

    /// Delivers `event` to every matching observer
    ///
    /// All observers run even if one fails; the first error is returned.
    pub async fn emit(&self, event: LifecycleEvent) -> Result<(), DomainError> {
        let observers = self.observers_for(&event.type_name);

        debug!(
            kind = %event.kind,
            type_name = %event.type_name,
            id = %event.id,
            observers = observers.len(),
            "Emitting lifecycle event"
        );

        let mut first_error = None;

        for observer in observers {
            if let Err(e) = observer.on_event(&event).await {
                warn!(
                    type_name = %event.type_name,
                    id = %event.id,
                    error = %e,
                    "Lifecycle observer failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
