/// Errors raised by a [`StorageMedium`](crate::medium::StorageMedium).
///
/// [`PersistentStore`](crate::persistent::PersistentStore) logs and
/// swallows these; they only surface to callers using a medium directly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
