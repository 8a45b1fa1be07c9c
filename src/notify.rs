//! Change notification bus.
//!
//! The store emits one [`ChangeEvent`] per committed transaction that wrote
//! at least one table. Subscribers are plain callbacks; they run on the
//! emitting thread after the commit, outside the bus lock, so a callback may
//! subscribe or unsubscribe without deadlocking.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

/// What a committed transaction changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Operation name passed to `Store::mutate`
    pub op: String,
    pub actor: String,
    /// Tables written by the transaction
    pub tables: BTreeSet<&'static str>,
    /// Commit time (Unix milliseconds)
    pub committed_at: i64,
}

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: BTreeMap<u64, Callback>,
}

/// Fan-out of change events to registered callbacks.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        // A panicking subscriber must not take the bus down with it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback`. Dropping the returned handle keeps the
    /// subscription alive; call [`Subscription::unsubscribe`] to end it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, Arc::new(callback));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    pub fn emit(&self, event: &ChangeEvent) {
        let callbacks: Vec<Callback> = self.lock().subscribers.values().cloned().collect();
        tracing::trace!(op = %event.op, subscribers = callbacks.len(), "emit change");
        for callback in callbacks {
            callback(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Handle returned by [`ChangeBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<BusInner>>,
}

impl Subscription {
    /// Stop receiving events. Returns false if the bus is gone or the
    /// subscription was already removed.
    pub fn unsubscribe(self) -> bool {
        self.bus.upgrade().is_some_and(|inner| {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .remove(&self.id)
                .is_some()
        })
    }
}
