//! Change listener bookkeeping shared by data sources.

use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::trace;
use uuid::Uuid;

use super::DataChange;

/// Callback invoked when a data source's content changes
pub type ChangeListener = Arc<dyn Fn(&DataChange) + Send + Sync>;

/// Handle returned when registering a listener; pass it back to remove the listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: Uuid,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Registered listeners, in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(Uuid, ChangeListener)>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: ChangeListener) -> Subscription {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, listener));
        trace!("Registered change listener {}", id);
        Subscription { id }
    }

    /// Returns false if the subscription was not registered here
    pub fn remove(&self, subscription: &Subscription) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription.id);
        let removed = listeners.len() != before;
        if removed {
            trace!("Removed change listener {}", subscription.id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener with `change`
    pub fn notify(&self, change: &DataChange) {
        // Snapshot so listeners may (de)register without deadlocking.
        let listeners: Vec<ChangeListener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(change);
        }
    }
}
