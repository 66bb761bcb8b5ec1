//! Key-scoped persisted value with cross-instance change notification.
//!
//! [`PersistentStore`] binds one storage key to a typed, in-memory copy of
//! its value. Writes go to the medium and the in-memory copy, then are
//! announced on the [`ChangeChannel`] so every other live store bound to
//! the same key picks them up without a reload.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use studio_events::{ChangeChannel, ChangeHandler, StorageChange, Subscription};
use tokio::sync::watch;
use uuid::Uuid;

use crate::medium::StorageMedium;

/// A typed value persisted under a single key.
///
/// The store never fails: unreadable or corrupt persisted data reads as the
/// default, and medium write failures (quota, I/O) are logged while the
/// in-memory value still updates. The change listener registered at
/// [`open`](Self::open) is released when the store is dropped.
pub struct PersistentStore<T> {
    key: String,
    origin: Uuid,
    medium: Arc<dyn StorageMedium>,
    channel: Arc<dyn ChangeChannel>,
    value: Arc<watch::Sender<T>>,
    write_lock: Mutex<()>,
    _subscription: Subscription,
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind a store to `key`.
    ///
    /// Reads the current persisted value. When the key is absent the medium
    /// is seeded with `default`; corrupt data is left in place and read as
    /// `default`.
    pub fn open(
        key: impl Into<String>,
        default: T,
        medium: Arc<dyn StorageMedium>,
        channel: Arc<dyn ChangeChannel>,
    ) -> Self {
        let key = key.into();

        let initial = match medium.get(&key) {
            Ok(Some(raw)) => parse_or(&key, &raw, &default),
            Ok(None) => {
                seed(medium.as_ref(), &key, &default);
                default.clone()
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read persisted value");
                default.clone()
            }
        };

        let (sender, _) = watch::channel(initial);
        let value = Arc::new(sender);
        let origin = Uuid::new_v4();

        let subscription = channel.subscribe(
            &key,
            change_listener(key.clone(), origin, Arc::downgrade(&value)),
        );

        tracing::debug!(key = %key, origin = %origin, "Persistent store opened");

        Self {
            key,
            origin,
            medium,
            channel,
            value,
            write_lock: Mutex::new(()),
            _subscription: subscription,
        }
    }

    /// The current value.
    pub fn read(&self) -> T {
        self.value.borrow().clone()
    }

    /// Persist `value`, update the in-memory copy, and notify other stores
    /// bound to the same key.
    pub fn write(&self, value: T) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_unlocked(value);
    }

    /// Read-modify-write under this store's write lock.
    ///
    /// Returns the value that was written.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> T {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let next = f(&self.read());
        self.write_unlocked(next.clone());
        next
    }

    /// Watch the value; the receiver is notified on local writes and on
    /// changes published by other stores.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Re-read the medium and adopt its value.
    ///
    /// Used after another process may have written the shared medium. An
    /// absent key or corrupt data keeps the current value. Returns whether
    /// the in-memory value was replaced.
    pub fn sync_from_medium(&self) -> bool {
        match self.medium.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.value.send_replace(value);
                    true
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Ignoring corrupt persisted value");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read persisted value");
                false
            }
        }
    }

    fn write_unlocked(&self, value: T) {
        let raw = match serde_json::to_string(&value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize value");
                None
            }
        };

        if let Some(raw) = raw.as_deref() {
            if let Err(e) = self.medium.set(&self.key, raw) {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "Failed to persist value, keeping in-memory copy only",
                );
            }
        }

        self.value.send_replace(value);

        if let Some(raw) = raw {
            self.channel.publish(StorageChange {
                key: self.key.clone(),
                new_value: Some(raw),
                origin: self.origin,
            });
        }
    }
}

fn parse_or<T: DeserializeOwned + Clone>(key: &str, raw: &str, default: &T) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(key = %key, error = %e, "Corrupt persisted value, using default");
        default.clone()
    })
}

fn seed<T: Serialize>(medium: &dyn StorageMedium, key: &str, default: &T) {
    let result = serde_json::to_string(default)
        .map_err(|e| e.to_string())
        .and_then(|raw| medium.set(key, &raw).map_err(|e| e.to_string()));
    if let Err(e) = result {
        tracing::warn!(key = %key, error = %e, "Failed to seed default value");
    }
}

/// Apply changes published by other stores to `value`.
///
/// Own changes and removals are ignored; unparseable payloads are logged
/// and dropped.
fn change_listener<T>(key: String, origin: Uuid, value: Weak<watch::Sender<T>>) -> ChangeHandler
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(move |change: &StorageChange| {
        if change.origin == origin {
            return;
        }
        let (Some(value), Some(raw)) = (value.upgrade(), change.new_value.as_deref()) else {
            return;
        };
        match serde_json::from_str::<T>(raw) {
            Ok(next) => {
                value.send_replace(next);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unparseable storage change");
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
