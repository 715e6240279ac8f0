//! Listener registry used to publish change notifications

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Handle returned by [`Subscribers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A set of listeners held by weak reference.
///
/// Subscribers stay registered for as long as the caller keeps its `Arc`
/// alive; dropped listeners are pruned on the next dispatch. A listener that
/// panics is logged and skipped, the remaining listeners still run.
pub struct Subscribers<T: ?Sized> {
    entries: RwLock<Vec<(SubscriptionId, Weak<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> Subscribers<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a subscriber
    pub fn subscribe(&self, subscriber: &Arc<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, Arc::downgrade(subscriber)));
        id
    }

    /// Remove a subscriber, returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of subscribers that are still alive
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `f` on every live subscriber.
    ///
    /// The registry lock is released before any callback runs, so a callback
    /// may subscribe or unsubscribe. Returns the number of callbacks that
    /// panicked.
    pub fn notify<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&T),
    {
        let live: Vec<(SubscriptionId, Arc<T>)> = {
            let mut entries = self.entries.write();

            // Remove any dead weak references
            entries.retain(|(_, weak)| weak.strong_count() > 0);
            entries
                .iter()
                .filter_map(|(id, weak)| weak.upgrade().map(|strong| (*id, strong)))
                .collect()
        };

        let mut failures = 0;
        for (id, subscriber) in live {
            let outcome = catch_unwind(AssertUnwindSafe(|| f(&subscriber)));
            if outcome.is_err() {
                failures += 1;
                tracing::error!(subscription = id.0, "listener panicked while handling notification");
            }
        }
        failures
    }
}

impl<T: ?Sized> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("live", &self.len())
            .finish()
    }
}
