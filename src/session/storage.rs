//! Durable key-value session storage.
//!
//! # Responsibilities
//! - Hold the persisted session keys (`token`, `refreshToken`, `user`,
//!   `lastActivityTime`)
//! - Mirror every mutation to disk so the next process start can restore it
//!
//! # Design Decisions
//! - String keys and string values, like browser local storage
//! - The file is the only copy: reads go to disk, and each write re-reads the
//!   file and changes a single key, so processes sharing a session file never
//!   write back each other's stale keys
//! - Writes hold an exclusive lock on a `.lock` sidecar and land through a
//!   temp file renamed into place
//! - An unreadable file is treated as an empty session

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use fd_lock::RwLock;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const LAST_ACTIVITY_KEY: &str = "lastActivityTime";

/// Errors raised while persisting session state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable client-side key-value storage.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key);
        Ok(())
    }
}

/// Storage persisted as a JSON object file, shareable between processes.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open the storage file, creating its directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(dir_of(&path))?;

        let mut lock_name = OsString::from(path.as_os_str());
        lock_name.push(".lock");

        let storage = Self {
            lock_path: PathBuf::from(lock_name),
            path,
            write_lock: Mutex::new(()),
        };

        let keys = storage.read_entries()?.len();
        tracing::debug!(path = %storage.path.display(), keys, "Opened session storage");
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents. Missing or corrupt files read as empty.
    fn read_entries(&self) -> Result<HashMap<String, String>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session storage unreadable, starting with an empty session"
                );
                Ok(HashMap::new())
            }
        }
    }

    /// Apply `change` to the on-disk entries under the cross-process lock.
    ///
    /// The file is rewritten only when `change` returns true.
    fn mutate<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut HashMap<String, String>) -> bool,
    {
        let _guard = self.write_lock.lock();

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        let mut file_lock = RwLock::new(lock_file);
        let _file_guard = file_lock.write()?;

        let mut entries = self.read_entries()?;
        if !change(&mut entries) {
            return Ok(());
        }

        let mut tmp = NamedTempFile::new_in(dir_of(&self.path))?;
        tmp.write_all(&serde_json::to_vec_pretty(&entries)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn dir_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| entries.remove(key).is_some())
    }
}
