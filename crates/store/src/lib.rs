//! Local persistence for the studio.
//!
//! - [`StorageMedium`]: raw key-value media ([`MemoryMedium`], [`FileMedium`]).
//! - [`PersistentStore`]: typed, key-scoped value kept in sync across
//!   every store bound to the same key.
//! - [`HistoryStore`]: the bounded generation history.
//! - [`MediumPoller`]: picks up writes made by other processes.

pub mod error;
pub mod history;
pub mod medium;
pub mod persistent;
pub mod poller;

pub use error::StoreError;
pub use history::{HistoryStore, HISTORY_STORAGE_KEY};
pub use medium::{FileMedium, MemoryMedium, StorageMedium};
pub use persistent::PersistentStore;
pub use poller::MediumPoller;
