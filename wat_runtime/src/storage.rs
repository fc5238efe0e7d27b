//! Raw key-value storage primitive.
//!
//! The backing store offers NO cross-key atomicity and may fail
//! mid-operation when capacity is exceeded — the Atomic Store in
//! `store.rs` layers the staged-commit protocol on top of this interface.
//!
//! Backends are injectable so stores can be instantiated in isolation
//! for tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Failures of the raw primitive. Capacity is distinct because callers
/// must halt the user-visible operation on it while prior committed
/// state stays intact.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage capacity exceeded writing key {key:?}")]
    CapacityExceeded { key: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// `get`/`set`/`remove` over opaque text values. Single logical writer;
/// no atomicity across keys is assumed.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

// ── In-memory backend ──────────────────────────────────────────────

/// In-memory backend with an optional byte quota, mirroring the
/// capacity behaviour of browser-style storage. A `set` that would
/// exceed the quota fails without mutating anything.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    capacity_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes once total stored value bytes would
    /// exceed `capacity_bytes`.
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(cap) = self.capacity_bytes {
            if self.used_bytes_excluding(key) + value.len() > cap {
                return Err(StorageError::CapacityExceeded {
                    key: key.to_string(),
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ── File-backed backend ────────────────────────────────────────────

/// One file per key under a directory. Keys are restricted to
/// `[A-Za-z0-9._-]` so a key can never escape the directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let ok = !key.is_empty()
            && key.chars().all(|c| {
                c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'
            });
        if !ok {
            return Err(StorageError::Backend(format!(
                "invalid storage key {:?}",
                key
            )));
        }
        Ok(self.dir.join(key))
    }

    fn map_io(key: &str, err: io::Error) -> StorageError {
        if err.kind() == io::ErrorKind::StorageFull {
            StorageError::CapacityExceeded {
                key: key.to_string(),
            }
        } else {
            StorageError::Backend(format!("{}: {}", key, err))
        }
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io(key, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| Self::map_io(key, e))?;
        fs::write(&path, value.as_bytes()).map_err(|e| Self::map_io(key, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_io(key, e)),
        }
    }
}
