//! A registry of callbacks that are told when the logged in identity changes.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::session::Identity;

type Callback = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// The subscribers to identity changes.
///
/// Callbacks run synchronously, in the order they subscribed.
#[derive(Default)]
pub(crate) struct Subscribers {
    registry: Arc<Mutex<Registry>>,
}

impl Subscribers {
    /// Register `callback` and return the handle that removes it again.
    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(Option<&Identity>) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Call every subscriber with `identity`.
    ///
    /// The registry is not locked while callbacks run, so a callback may
    /// subscribe or unsubscribe. Those changes apply from the next publish.
    pub(crate) fn publish(&self, identity: Option<&Identity>) {
        let callbacks: Vec<Callback> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(identity);
        }
    }

    /// The number of active subscriptions.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }
}

/// The handle for a subscription to identity changes.
///
/// Dropping the handle does not unsubscribe: call [Subscription::unsubscribe].
#[must_use = "the subscription stays active until `unsubscribe` is called"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving identity changes.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry)
                .callbacks
                .retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
