//! Cross-process change detection for a shared storage medium.
//!
//! Other processes writing the same [`FileMedium`](crate::medium::FileMedium)
//! do not publish on this process's [`ChangeChannel`]. [`MediumPoller`]
//! periodically reads the watched keys and publishes any value that did
//! not originate in this process, which is what lets stores in separate
//! processes converge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use studio_events::{ChangeChannel, StorageChange, Subscription};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::medium::StorageMedium;

type LastSeen = Arc<Mutex<HashMap<String, Option<String>>>>;

/// Polls watched keys and republishes foreign changes.
pub struct MediumPoller {
    medium: Arc<dyn StorageMedium>,
    channel: Arc<dyn ChangeChannel>,
    interval: Duration,
    origin: Uuid,
    last_seen: LastSeen,
    _subscriptions: Vec<Subscription>,
}

impl MediumPoller {
    /// Watch `keys` on `medium`, publishing foreign changes on `channel`.
    ///
    /// The current medium contents are taken as already seen. After every
    /// in-process change the medium is re-read, so local writes are never
    /// echoed back and a write the medium rejected is never reverted.
    pub fn new(
        medium: Arc<dyn StorageMedium>,
        channel: Arc<dyn ChangeChannel>,
        keys: &[&str],
        interval: Duration,
    ) -> Self {
        let origin = Uuid::new_v4();
        let last_seen: LastSeen = Arc::default();

        let mut subscriptions = Vec::with_capacity(keys.len());
        for &key in keys {
            let initial = medium.get(key).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Failed to read watched key");
                None
            });
            lock(&last_seen).insert(key.to_string(), initial);

            let seen = Arc::clone(&last_seen);
            let stored = Arc::clone(&medium);
            subscriptions.push(channel.subscribe(
                key,
                Arc::new(move |change: &StorageChange| {
                    if change.origin == origin {
                        return;
                    }
                    // A published value may not have reached the medium, so
                    // track what the medium holds rather than the payload.
                    match stored.get(&change.key) {
                        Ok(current) => {
                            lock(&seen).insert(change.key.clone(), current);
                        }
                        Err(e) => {
                            tracing::warn!(key = %change.key, error = %e, "Failed to read watched key");
                        }
                    }
                }),
            ));
        }

        Self {
            medium,
            channel,
            interval,
            origin,
            last_seen,
            _subscriptions: subscriptions,
        }
    }

    /// Check every watched key once. Returns the number of changes
    /// published.
    pub fn poll_once(&self) -> usize {
        let keys: Vec<String> = lock(&self.last_seen).keys().cloned().collect();
        let mut published = 0;

        for key in keys {
            let current = match self.medium.get(&key) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to poll watched key");
                    continue;
                }
            };

            let changed = {
                let mut seen = lock(&self.last_seen);
                let previous = seen.insert(key.clone(), current.clone());
                previous.as_ref() != Some(&current)
            };

            if changed {
                tracing::debug!(key = %key, "Detected external storage change");
                self.channel.publish(StorageChange {
                    key,
                    new_value: current,
                    origin: self.origin,
                });
                published += 1;
            }
        }

        published
    }

    /// Poll on an interval until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Medium poller cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.poll_once();
                }
            }
        }
    }
}

fn lock(seen: &LastSeen) -> MutexGuard<'_, HashMap<String, Option<String>>> {
    seen.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use studio_events::InProcessChannel;

    use super::*;
    use crate::medium::MemoryMedium;
    use crate::persistent::PersistentStore;

    /// Two "processes": separate channels sharing one medium.
    struct TwoProcesses {
        medium: Arc<MemoryMedium>,
        channel_a: Arc<InProcessChannel>,
        channel_b: Arc<InProcessChannel>,
    }

    impl TwoProcesses {
        fn new() -> Self {
            Self {
                medium: Arc::new(MemoryMedium::new()),
                channel_a: Arc::new(InProcessChannel::new()),
                channel_b: Arc::new(InProcessChannel::new()),
            }
        }

        fn store_a(&self) -> PersistentStore<u32> {
            PersistentStore::open("k", 0, self.medium.clone(), self.channel_a.clone())
        }

        fn store_b(&self) -> PersistentStore<u32> {
            PersistentStore::open("k", 0, self.medium.clone(), self.channel_b.clone())
        }

        fn poller_b(&self) -> MediumPoller {
            MediumPoller::new(
                self.medium.clone(),
                self.channel_b.clone(),
                &["k"],
                Duration::from_millis(100),
            )
        }
    }

    #[test]
    fn foreign_write_reaches_other_process() {
        let procs = TwoProcesses::new();
        let a = procs.store_a();
        let b = procs.store_b();
        let poller = procs.poller_b();

        a.write(9);
        assert_eq!(b.read(), 0);

        assert_eq!(poller.poll_once(), 1);
        assert_eq!(b.read(), 9);
    }

    #[test]
    fn local_writes_are_not_echoed() {
        let procs = TwoProcesses::new();
        let b = procs.store_b();
        let poller = procs.poller_b();

        b.write(3);
        assert_eq!(poller.poll_once(), 0);
    }

    #[test]
    fn rejected_write_is_not_reverted_by_poll() {
        let medium = Arc::new(MemoryMedium::with_quota(4));
        let channel = Arc::new(InProcessChannel::new());
        let store: PersistentStore<u32> =
            PersistentStore::open("k", 0, medium.clone(), channel.clone());
        let poller = MediumPoller::new(
            medium.clone(),
            channel.clone(),
            &["k"],
            Duration::from_millis(100),
        );

        store.write(12345);
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("0"));
        assert_eq!(store.read(), 12345);

        assert_eq!(poller.poll_once(), 0);
        assert_eq!(store.read(), 12345);
    }

    #[test]
    fn unchanged_medium_publishes_nothing() {
        let procs = TwoProcesses::new();
        let _b = procs.store_b();
        let poller = procs.poller_b();

        assert_eq!(poller.poll_once(), 0);
        assert_eq!(poller.poll_once(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel() {
        let procs = TwoProcesses::new();
        let a = procs.store_a();
        let b = procs.store_b();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(procs.poller_b().run(cancel.clone()));

        a.write(5);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(b.read(), 5);

        cancel.cancel();
        handle.await.expect("poller task panicked");
    }
}
