//! Read-through cache that never resurrects invalidated values.
//!
//! Loads and writes for one key are serialized by a per-key lock. A global
//! epoch guards `invalidate_all`: a load records the epoch before reading the
//! store and only populates the cache if the epoch is unchanged.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::locks::KeyedLocks;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub epoch: u64,
}

pub struct InvalidatingCache<K: Eq + Hash + Clone, V: Clone> {
    name: &'static str,
    // `None` caches a confirmed absence.
    entries: DashMap<K, Option<V>>,
    locks: KeyedLocks<K>,
    epoch: RwLock<u64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> InvalidatingCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            locks: KeyedLocks::new(),
            epoch: RwLock::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn cached(&self, key: &K) -> Option<Option<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the cached value for `key`, loading it with `load` on a miss.
    /// Load failures are returned as-is and nothing is cached.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> AppResult<Option<V>>
    where
        F: FnOnce() -> AppResult<Option<V>>,
    {
        if let Some(value) = self.cached(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(cache = self.name, key = ?key, "Cache hit");
            return Ok(value);
        }

        self.locks.with_lock(key, || {
            if let Some(value) = self.cached(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);

            let epoch = *self.epoch.read();
            let value = load()?;

            let current = self.epoch.read();
            if *current == epoch {
                self.entries.insert(key.clone(), value.clone());
            } else {
                debug!(cache = self.name, key = ?key, "Cache cleared during load, not populating");
            }
            Ok(value)
        })
    }

    /// Performs `write` under the key's lock, then drops the entry. The entry
    /// is gone by the time this returns, whether or not the write failed.
    pub fn write_through<R, F>(&self, key: &K, write: F) -> AppResult<R>
    where
        F: FnOnce() -> AppResult<R>,
    {
        self.locks.with_lock(key, || {
            let result = write();
            self.entries.remove(key);
            debug!(cache = self.name, key = ?key, "Invalidated cache entry");
            result
        })
    }

    /// Performs `write`, then drops every entry and starts a new epoch so that
    /// loads already in flight do not repopulate stale values.
    pub fn write_all<R, F>(&self, write: F) -> AppResult<R>
    where
        F: FnOnce() -> AppResult<R>,
    {
        let result = write();
        self.invalidate_all();
        result
    }

    pub fn invalidate(&self, key: &K) {
        self.locks.with_lock(key, || {
            self.entries.remove(key);
        });
    }

    pub fn invalidate_all(&self) {
        let mut epoch = self.epoch.write();
        *epoch += 1;
        self.entries.clear();
        debug!(cache = self.name, epoch = *epoch, "Cleared cache");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
            epoch: *self.epoch.read(),
        }
    }
}
