use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::CacheError;
use crate::graph::TreeGraph;

/// A cached graph plus the bookkeeping needed to expire it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Rendered [`super::CacheKey`].
    pub key: String,
    pub graph: TreeGraph,
    pub inserted_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl StoredEntry {
    pub fn new(key: impl Into<String>, graph: TreeGraph, inserted_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            graph,
            inserted_at,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the entry has outlived its TTL at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.inserted_at).num_milliseconds();
        age_ms < 0 || age_ms as u64 >= self.ttl_ms
    }
}

/// Trait for persistent tree cache backends.
///
/// Implementations only persist; expiry is decided by [`super::TreeCache`].
pub trait CacheStore: Send + Sync {
    /// Loads the entry stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<StoredEntry>, CacheError>;

    /// Saves an entry, replacing whatever was stored under its key.
    fn save(&self, entry: &StoredEntry) -> Result<(), CacheError>;

    /// Removes the entry stored under `key`. Missing entries are not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every entry.
    fn clear(&self) -> Result<(), CacheError>;
}

/// File-based cache store.
///
/// One JSON file per key:
/// ```text
/// {cache_dir}/
///   {sha256(key)}.json
/// ```
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file holding `key`.
    fn entry_file(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Ensures the cache directory exists.
    fn ensure_dir(&self) -> Result<(), CacheError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        }
        Ok(())
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let path = self.entry_file(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| CacheError::io(&path, e))?;
        let entry: StoredEntry = serde_json::from_str(&json)?;

        // Hash collision or a file written for another key.
        if entry.key != key {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn save(&self, entry: &StoredEntry) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let path = self.entry_file(&entry.key);
        let json = serde_json::to_string(entry)?;
        fs::write(&path, json).map_err(|e| CacheError::io(&path, e))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_file(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        if !self.dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
            }
        }

        Ok(())
    }
}

/// In-memory store, mostly for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, entry: &StoredEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }
}
