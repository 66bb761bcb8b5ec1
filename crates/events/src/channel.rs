//! Key-scoped change notification for persisted values.
//!
//! A [`ChangeChannel`] carries [`StorageChange`]s between independent
//! consumers of the same storage key. [`InProcessChannel`] dispatches
//! synchronously to every listener registered in this process; a
//! multi-process deployment feeds the same channel from a poller that
//! watches the shared medium.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

/// A change to the value stored under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// Serialized value after the change; `None` when the key was removed.
    pub new_value: Option<String>,
    /// Identity of the publisher, so a writer can skip its own changes.
    pub origin: Uuid,
}

/// Callback invoked for every change to a subscribed key.
pub type ChangeHandler = Arc<dyn Fn(&StorageChange) + Send + Sync>;

/// Publish/subscribe seam for storage changes.
pub trait ChangeChannel: Send + Sync {
    /// Deliver `change` to every listener of `change.key`.
    fn publish(&self, change: StorageChange);

    /// Register `handler` for `key`. The listener stays registered until
    /// the returned [`Subscription`] is dropped.
    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription;
}

// ---------------------------------------------------------------------------
// Subscription guard
// ---------------------------------------------------------------------------

/// Registration handle; dropping it deregisters the listener.
#[must_use = "dropping a Subscription immediately deregisters the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap the action that deregisters a listener.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// InProcessChannel
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(u64, ChangeHandler)>>>,
}

impl Registry {
    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, ChangeHandler)>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, key: &str, id: u64) {
        let mut listeners = self.listeners();
        if let Some(list) = listeners.get_mut(key) {
            list.retain(|(listener_id, _)| *listener_id != id);
            if list.is_empty() {
                listeners.remove(key);
            }
        }
    }
}

/// Direct, synchronous in-memory dispatch.
///
/// Handlers run on the publishing thread after the registry lock is
/// released, so a handler may itself publish or subscribe.
#[derive(Default, Clone)]
pub struct InProcessChannel {
    registry: Arc<Registry>,
}

impl InProcessChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners for `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        self.registry.listeners().get(key).map_or(0, Vec::len)
    }
}

impl ChangeChannel for InProcessChannel {
    fn publish(&self, change: StorageChange) {
        let handlers: Vec<ChangeHandler> = self
            .registry
            .listeners()
            .get(&change.key)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        tracing::trace!(key = %change.key, listeners = handlers.len(), "Dispatching storage change");

        for handler in handlers {
            handler(&change);
        }
    }

    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners()
            .entry(key.to_string())
            .or_default()
            .push((id, handler));

        let registry: Weak<Registry> = Arc::downgrade(&self.registry);
        let key = key.to_string();
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(&key, id);
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
