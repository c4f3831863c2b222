//! Listener registry used to fan store events out to many consumers.
//!
//! Each callback is stored under a monotonically increasing id in a
//! `scc::HashMap`, so registering and removing listeners never blocks
//! emitters. [`Listeners::add`] hands back a [`Subscription`] that removes
//! exactly its own callback when unsubscribed or dropped.

use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: AtomicU64,
    callbacks: scc::HashMap<u64, Callback<T>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T: 'static> Detach for Registry<T> {
    fn detach(&self, id: u64) {
        self.callbacks.remove_sync(&id);
    }
}

/// A set of callbacks that all receive every emitted value.
pub struct Listeners<T> {
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Listeners<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                callbacks: scc::HashMap::new(),
            }),
        }
    }

    /// Register `callback`; it stays registered until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn add(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        // Ids are never reused, so the insert cannot collide.
        let _ = self.registry.callbacks.insert_sync(id, Arc::new(callback));

        let registry: Arc<dyn Detach> = self.registry.clone();
        Subscription {
            id,
            registry: Some(Arc::downgrade(&registry)),
        }
    }

    /// Call every registered callback with `value`, in registration order.
    ///
    /// Callbacks are collected first and invoked without holding any map
    /// entry, so a callback may add or remove listeners.
    pub fn emit(&self, value: &T) {
        let mut callbacks = Vec::with_capacity(self.registry.callbacks.len());
        self.registry.callbacks.retain_sync(|id, callback| {
            callbacks.push((*id, Arc::clone(callback)));
            true
        });
        callbacks.sort_unstable_by_key(|(id, _)| *id);

        for (_, callback) in callbacks {
            callback(value);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.registry.callbacks.len()
    }

    /// Check if no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.callbacks.is_empty()
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.registry.callbacks.len())
            .finish()
    }
}

/// Handle for one registered callback.
///
/// Dropping it unregisters the callback; call [`detach`](Self::detach) to
/// keep the callback for the lifetime of its registry instead.
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Unregister the callback now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callback registered after this handle is dropped.
    pub fn detach(mut self) {
        self.registry = None;
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}
