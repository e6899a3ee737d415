//! Subscriber registry and fan-out.
//!
//! [`SubscriptionRegistry`] keeps a thread-safe, registration-ordered set of
//! subscribers and pushes each invalidation event (or failure notification)
//! to all of them. Registration and removal may happen concurrently with a
//! publish; each publish fans out over a consistent snapshot, so a
//! subscriber is invoked at most once per event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::event::InvalidationEvent;

/// Capability implemented by consumers of the invalidation feed.
///
/// Callbacks run synchronously on the delivery thread and must not block
/// for long. A panicking subscriber is isolated: delivery continues to the
/// remaining subscribers and the listener keeps running.
pub trait InvalidationSubscriber: Send + Sync {
    /// Called once per delivered invalidation event.
    fn on_event(&self, event: &InvalidationEvent);

    /// Called once per delivery failure (e.g., a malformed payload).
    fn on_error(&self, error: &RelayError);
}

type SubscriberList = RwLock<Vec<Arc<dyn InvalidationSubscriber>>>;

/// Thread-safe, ordered set of subscribers with push-based fan-out.
pub struct SubscriptionRegistry {
    subscribers: Arc<SubscriberList>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Registers a subscriber and returns a handle that removes it on drop.
    ///
    /// Identity is pointer identity: subscribing the same `Arc` twice is a
    /// no-op and still yields a single delivery per event.
    pub fn subscribe(&self, subscriber: Arc<dyn InvalidationSubscriber>) -> SubscriptionHandle {
        {
            let mut subs = self.subscribers.write();
            if !subs.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
                subs.push(Arc::clone(&subscriber));
                debug!(subscribers = subs.len(), "subscriber registered");
            }
        }
        SubscriptionHandle {
            subscribers: Arc::downgrade(&self.subscribers),
            subscriber: Some(Arc::downgrade(&subscriber)),
        }
    }

    /// Removes a subscriber. No-op when it was never (or already) removed.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn InvalidationSubscriber>) {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|s| !Arc::ptr_eq(s, subscriber));
        if subs.len() < before {
            debug!(subscribers = subs.len(), "subscriber removed");
        }
    }

    /// Delivers an event to every registered subscriber, in registration
    /// order, synchronously with respect to the caller.
    pub fn publish(&self, event: &InvalidationEvent) {
        for subscriber in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event))).is_err() {
                warn!(key = %event.key, "subscriber panicked while handling event");
            }
        }
    }

    /// Delivers a failure notification with the same fan-out semantics as
    /// [`publish`](Self::publish).
    pub fn publish_error(&self, error: &RelayError) {
        for subscriber in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| subscriber.on_error(error))).is_err() {
                warn!("subscriber panicked while handling error notification");
            }
        }
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns whether the registry has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn InvalidationSubscriber>> {
        self.subscribers.read().clone()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`SubscriptionRegistry::subscribe`].
///
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe))
/// removes exactly the subscriber it was created for. Both are no-ops when
/// the subscriber was already removed through the registry.
pub struct SubscriptionHandle {
    subscribers: Weak<SubscriberList>,
    subscriber: Option<Weak<dyn InvalidationSubscriber>>,
}

impl SubscriptionHandle {
    /// Removes the associated subscriber. Idempotent.
    pub fn unsubscribe(&mut self) {
        let Some(subscriber) = self.subscriber.take() else {
            return;
        };
        let (Some(subs), Some(subscriber)) = (self.subscribers.upgrade(), subscriber.upgrade())
        else {
            return;
        };
        subs.write().retain(|s| !Arc::ptr_eq(s, &subscriber));
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.subscriber.is_some())
            .finish()
    }
}
