//! Key-value persistence media.
//!
//! A [`StorageMedium`] stores raw serialized strings under string keys,
//! the way browser local storage does. [`MemoryMedium`] lives for the
//! process; [`FileMedium`] keeps one file per key and survives restarts.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Raw key-value persistence.
pub trait StorageMedium: Send + Sync {
    /// Return the raw value under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryMedium
// ---------------------------------------------------------------------------

/// Process-local medium with an optional byte quota.
///
/// The quota counts key and value bytes of every entry. A `set` whose
/// resulting total would exceed it fails with
/// [`StoreError::QuotaExceeded`] and leaves the previous value in place.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that refuses writes beyond `quota` bytes in total.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(quota),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileMedium
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a data directory.
///
/// Writes go to a uniquely named temporary file that is renamed over the
/// target, so concurrent writers never share a temp file and readers never
/// observe a partial value.
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
}

impl FileMedium {
    /// Open (creating if needed) the data directory at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Keys map to file names: non-empty, `[A-Za-z0-9._-]`, no leading dot.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl StorageMedium for FileMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        // Each call gets its own temp file; it is removed on drop if the
        // rename never happens.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // -- MemoryMedium --

    #[test]
    fn memory_get_set_remove() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.get("k").unwrap(), None);

        medium.set("k", "\"v\"").unwrap();
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("\"v\""));

        medium.remove("k").unwrap();
        assert_eq!(medium.get("k").unwrap(), None);
    }

    #[test]
    fn memory_quota_rejects_and_keeps_previous_value() {
        let medium = MemoryMedium::with_quota(8);
        medium.set("k", "12345").unwrap();

        let err = medium.set("k", "1234567890").unwrap_err();
        assert_matches!(err, StoreError::QuotaExceeded { needed: 11, quota: 8, .. });
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn memory_quota_counts_replaced_key_once() {
        let medium = MemoryMedium::with_quota(6);
        medium.set("k", "12345").unwrap();
        medium.set("k", "54321").unwrap();
    }

    // -- FileMedium --

    #[test]
    fn file_round_trip_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = FileMedium::open(dir.path()).unwrap();
        a.set("ai-studio-history", "[]").unwrap();

        let b = FileMedium::open(dir.path()).unwrap();
        assert_eq!(b.get("ai-studio-history").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn file_missing_key_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let medium = FileMedium::open(dir.path()).unwrap();
        assert_eq!(medium.get("absent").unwrap(), None);
        medium.remove("absent").unwrap();
    }

    #[test]
    fn file_set_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let medium = FileMedium::open(dir.path()).unwrap();
        medium.set("k", "1").unwrap();
        medium.set("k", "2").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["k.json"]);
    }

    #[test]
    fn file_concurrent_same_key_writes_all_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let medium = std::sync::Arc::new(FileMedium::open(dir.path()).unwrap());
        let big_a = "a".repeat(512 * 1024);
        let big_b = "b".repeat(512 * 1024);

        for _ in 0..20 {
            let handles: Vec<_> = [big_a.clone(), big_b.clone()]
                .into_iter()
                .map(|value| {
                    let medium = std::sync::Arc::clone(&medium);
                    std::thread::spawn(move || medium.set("k", &value))
                })
                .collect();

            for handle in handles {
                handle.join().expect("writer panicked").unwrap();
            }

            let stored = medium.get("k").unwrap().unwrap();
            assert!(stored == big_a || stored == big_b, "torn value");
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["k.json"]);
    }

    #[test]
    fn file_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let medium = FileMedium::open(dir.path()).unwrap();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert_matches!(medium.set(key, "x"), Err(StoreError::InvalidKey(_)));
        }
    }
}
