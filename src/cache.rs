//! Bounded, time-expiring memoization.
//!
//! [`LoadingCache`] computes a value on miss through a caller-supplied loader
//! and keeps it for a fixed time-to-live, evicting least-recently-used
//! entries once the capacity is reached. Loaders run outside the lock:
//! callers racing on the same key may each compute the value, and the last
//! write wins. Failed loads are returned to the caller and never stored.

use log::debug;
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default entry bound for the document caches
pub const DEFAULT_MAXIMUM_SIZE: usize = 1000;

/// Default time-to-live measured from the write
pub const DEFAULT_EXPIRE_AFTER_WRITE: Duration = Duration::from_secs(24 * 60 * 60);

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct LoadingCache<K, V> {
    entries: Mutex<LruCache<K, (Instant, V)>>,
    expire_after_write: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq + Clone, V: Clone> LoadingCache<K, V> {
    pub fn new(maximum_size: usize, expire_after_write: Duration) -> Self {
        let capacity = NonZeroUsize::new(maximum_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            expire_after_write,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the live value for `key`, if any, without loading
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            None => return None,
            Some((written, value)) if written.elapsed() < self.expire_after_write => {
                return Some(value.clone());
            }
            Some(_) => {}
        }
        debug!("Evicting expired cache entry");
        entries.pop(key);
        None
    }

    /// Returns the cached value or computes, stores and returns it
    pub fn get_or_try_load<E>(&self, key: &K, loader: impl FnOnce(&K) -> Result<V, E>) -> Result<V, E> {
        if let Some(value) = self.get_if_present(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = loader(key)?;
        self.lock().put(key.clone(), (Instant::now(), value.clone()));
        Ok(value)
    }

    /// Drops every entry
    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    /// Number of physically present entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, (Instant, V)>> {
        // Entries are only ever written whole, so a poisoned guard is still consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Default for LoadingCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAXIMUM_SIZE, DEFAULT_EXPIRE_AFTER_WRITE)
    }
}
