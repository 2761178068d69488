//! TTL-based memoizing store for derived datasets.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::fingerprint::Fingerprint;
use crate::telemetry::PerformanceMonitor;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000;

/// A cached value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Dataset fingerprint this value was derived from.
    pub key: Fingerprint,
    /// Derived value.
    pub value: T,
    /// Insertion time.
    pub inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still fresh at `now`.
    ///
    /// An entry is fresh while its age is strictly below the TTL.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// A cache the global sweeper can clean.
pub trait Sweepable: Send + Sync {
    /// Cache name used in logs.
    fn name(&self) -> &str;

    /// Remove every expired entry, returning how many were removed.
    fn cleanup(&self) -> usize;
}

/// Memoizing store keyed by [`Fingerprint`].
///
/// Never fails: a miss (absent or expired) returns `None` and the caller
/// recomputes. Expired entries are never returned; they are evicted lazily
/// on access and in bulk by [`cleanup`](Self::cleanup).
///
/// Collisions follow last-write-wins.
pub struct DataCache<T> {
    name: String,
    ttl: Duration,
    entries: Mutex<HashMap<Fingerprint, CacheEntry<T>>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl<T: Clone> DataCache<T> {
    /// Create a cache reporting hits and misses to `monitor`.
    pub fn new(
        name: impl Into<String>,
        ttl: Duration,
        monitor: Option<Arc<PerformanceMonitor>>,
    ) -> Self {
        Self {
            name: name.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
            monitor,
        }
    }

    /// Create a cache without telemetry.
    pub fn unmonitored(name: impl Into<String>, ttl: Duration) -> Self {
        Self::new(name, ttl, None)
    }

    /// Look up a fresh value.
    pub fn get(&self, key: &Fingerprint) -> Option<T> {
        self.get_at(key, Instant::now())
    }

    /// Look up a fresh value as of `now`.
    pub fn get_at(&self, key: &Fingerprint, now: Instant) -> Option<T> {
        let value = {
            let mut entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) if entry.is_fresh(self.ttl, now) => Some(entry.value.clone()),
                Some(_) => {
                    entries.remove(key);
                    tracing::trace!(cache = %self.name, key = %key, "Expired entry evicted on read");
                    None
                }
                None => None,
            }
        };

        if let Some(monitor) = &self.monitor {
            monitor.record_cache_access(&self.name, value.is_some());
        }
        value
    }

    /// Insert or overwrite a value stamped with the current time.
    pub fn set(&self, key: Fingerprint, value: T) {
        self.set_at(key, value, Instant::now());
    }

    /// Insert or overwrite a value stamped with `now`.
    pub fn set_at(&self, key: Fingerprint, value: T, now: Instant) {
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: now,
        };
        self.entries.lock().insert(key, entry);
    }

    /// Return the cached value or compute, store and return a new one.
    ///
    /// `compute` runs without the cache lock held. Concurrent misses on the
    /// same key may both compute; the last one stored wins.
    pub fn get_or_insert_with<F>(&self, key: &Fingerprint, compute: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.set(key.clone(), value.clone());
        value
    }

    /// Remove one entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &Fingerprint) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove expired entries as of `now`.
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Clone + Send> Sweepable for DataCache<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }
}

impl<T> fmt::Debug for DataCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.lock().len())
            .field("monitored", &self.monitor.is_some())
            .finish()
    }
}
