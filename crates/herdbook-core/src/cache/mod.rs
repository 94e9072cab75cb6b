//! Process-wide cache of fetched tree graphs.
//!
//! Entries are keyed by [`CacheKey`] and expire after a TTL measured with an
//! injected [`Clock`]. An optional [`CacheStore`] persists entries across
//! runs. All writes to the in-memory map happen under one lock, so a
//! background refresh and a foreground write to the same key cannot
//! interleave; [`TreeCache::replace_if_newer`] is the compare-and-swap used
//! for stale-while-revalidate.

mod clock;
mod error;
mod key;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use key::{normalize_fields, CacheKey};
pub use store::{CacheStore, FileCacheStore, MemoryCacheStore, StoredEntry};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};

use crate::config::CacheConfig;
use crate::graph::TreeGraph;

/// Tree graph cache with TTL and optional persistence.
pub struct TreeCache {
    entries: Mutex<HashMap<CacheKey, StoredEntry>>,
    revalidating: Mutex<HashSet<CacheKey>>,
    store: Option<Box<dyn CacheStore>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TreeCache {
    /// Creates an in-memory cache on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            revalidating: Mutex::new(HashSet::new()),
            store: None,
            clock: Arc::new(SystemClock),
            ttl,
        }
    }

    /// Creates a cache from configuration, persisting to disk when enabled.
    pub fn from_config(config: &CacheConfig) -> Self {
        let cache = Self::new(config.ttl());
        if config.persist {
            cache.with_store(FileCacheStore::new(config.cache_dir()))
        } else {
            cache
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store(mut self, store: impl CacheStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, StoredEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached graph for `key` if it has not expired.
    ///
    /// Falls back to the persistent store on a memory miss.
    pub fn get(&self, key: &CacheKey) -> Option<TreeGraph> {
        let now = self.clock.now();
        let mut entries = self.entries();

        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.graph.clone());
            }
            debug!("Cache entry {} expired", key);
            entries.remove(key);
        }

        let stored = self.load_persisted(key)?;
        if stored.is_expired(now) {
            debug!("Persisted cache entry {} expired", key);
            self.remove_persisted(key);
            return None;
        }
        let graph = stored.graph.clone();
        entries.insert(key.clone(), stored);
        Some(graph)
    }

    /// Stores `graph` under `key` with the default TTL.
    pub fn set(&self, key: &CacheKey, graph: TreeGraph) {
        self.set_with_ttl(key, graph, self.ttl);
    }

    /// Stores `graph` under `key` with an explicit TTL.
    pub fn set_with_ttl(&self, key: &CacheKey, graph: TreeGraph, ttl: Duration) {
        let entry = StoredEntry::new(key.to_string(), graph, self.clock.now(), ttl);
        let mut entries = self.entries();
        self.persist(&entry);
        entries.insert(key.clone(), entry);
    }

    /// Replaces the entry for `key` when `graph` is strictly newer than the
    /// cached one, or when nothing live is cached. Returns whether it did.
    pub fn replace_if_newer(&self, key: &CacheKey, graph: TreeGraph) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();

        let replace = match entries.get(key) {
            Some(current) if !current.is_expired(now) => graph.is_newer_than(&current.graph),
            _ => true,
        };

        if replace {
            let entry = StoredEntry::new(key.to_string(), graph, now, self.ttl);
            self.persist(&entry);
            entries.insert(key.clone(), entry);
        }
        replace
    }

    /// Drops every entry, in memory and on disk.
    pub fn clear(&self) {
        self.entries().clear();
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("Failed to clear persisted tree cache: {}", e);
            }
        }
    }

    /// Number of entries held in memory, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks `key` as being refreshed in the background.
    ///
    /// Returns `None` when a refresh for `key` is already running.
    pub fn begin_revalidation(&self, key: &CacheKey) -> Option<RevalidationGuard<'_>> {
        let mut running = self
            .revalidating
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !running.insert(key.clone()) {
            return None;
        }
        Some(RevalidationGuard {
            cache: self,
            key: key.clone(),
        })
    }

    fn load_persisted(&self, key: &CacheKey) -> Option<StoredEntry> {
        let store = self.store.as_ref()?;
        match store.load(&key.to_string()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read persisted cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn remove_persisted(&self, key: &CacheKey) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(&key.to_string()) {
                warn!("Failed to remove persisted cache entry {}: {}", key, e);
            }
        }
    }

    fn persist(&self, entry: &StoredEntry) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(entry) {
                warn!("Failed to persist cache entry {}: {}", entry.key, e);
            }
        }
    }
}

/// Releases a key's background-refresh slot when dropped.
pub struct RevalidationGuard<'a> {
    cache: &'a TreeCache,
    key: CacheKey,
}

impl Drop for RevalidationGuard<'_> {
    fn drop(&mut self) {
        self.cache
            .revalidating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
