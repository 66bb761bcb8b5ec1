//! The persisted generation history.

use std::sync::Arc;

use studio_core::generation::{push_history, HistoryEntry};
use studio_events::ChangeChannel;
use tokio::sync::watch;

use crate::medium::StorageMedium;
use crate::persistent::PersistentStore;

/// Storage key of the history list.
pub const HISTORY_STORAGE_KEY: &str = "ai-studio-history";

/// Most-recent-first list of past generations, bounded to
/// [`MAX_HISTORY_ENTRIES`](studio_core::generation::MAX_HISTORY_ENTRIES).
pub struct HistoryStore {
    store: PersistentStore<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn open(medium: Arc<dyn StorageMedium>, channel: Arc<dyn ChangeChannel>) -> Self {
        Self {
            store: PersistentStore::open(HISTORY_STORAGE_KEY, Vec::new(), medium, channel),
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.store.read()
    }

    /// Insert `entry` at the head, dropping the oldest entries past the
    /// bound. Returns the new list.
    pub fn record(&self, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let list = self.store.update(|current| push_history(current, entry));
        tracing::debug!(len = list.len(), "History updated");
        list
    }

    pub fn find(&self, id: &str) -> Option<HistoryEntry> {
        self.store.read().into_iter().find(|e| e.id == id)
    }

    pub fn clear(&self) {
        self.store.write(Vec::new());
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<HistoryEntry>> {
        self.store.subscribe()
    }

    pub fn sync_from_medium(&self) -> bool {
        self.store.sync_from_medium()
    }
}
