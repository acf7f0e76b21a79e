//! Minimal publish/subscribe primitive for schema snapshots.
//!
//! Listeners are invoked synchronously in subscription order. There is no
//! isolation between listeners: a panicking listener unwinds through the
//! mutating call.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: Mutex<Vec<(u64, Listener)>>,
}

/// Listener registry shared by a schema instance and its subscriptions.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    next_id: Arc<AtomicU64>,
    registry: Arc<Registry>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the returned [`Subscription`] removes it.
    pub(crate) fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .lock()
            .expect("observer mutex poisoned")
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Notify every listener with the snapshot, in subscription order.
    pub(crate) fn notify(&self, snapshot: &Value) {
        // Listener list is cloned so a listener may subscribe/unsubscribe
        // without deadlocking.
        let listeners: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .expect("observer mutex poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registry.listeners.lock().unwrap().len()
    }
}

/// Handle for an active listener registration.
#[must_use = "dropping a Subscription without calling unsubscribe leaves the listener registered"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the listener.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .listeners
                .lock()
                .expect("observer mutex poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_notify_in_subscription_order() {
        let observers = Observers::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _a = observers.subscribe(move |_| o1.lock().unwrap().push("a"));
        let o2 = order.clone();
        let _b = observers.subscribe(move |_| o2.lock().unwrap().push("b"));

        observers.notify(&json!({}));
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let observers = Observers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let sub = observers.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        observers.notify(&json!({}));
        sub.unsubscribe();
        observers.notify(&json!({}));

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(observers.len(), 0);
    }

    #[test]
    fn test_listener_sees_snapshot() {
        let observers = Observers::new();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let _sub = observers.subscribe(move |snapshot| {
            *s.lock().unwrap() = Some(snapshot.clone());
        });
        observers.notify(&json!({"step1": {"title": "T"}}));
        assert_eq!(
            seen.lock().unwrap().as_ref().unwrap()["step1"]["title"],
            "T"
        );
    }
}
