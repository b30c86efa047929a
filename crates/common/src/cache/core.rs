//! Bounded TTL + LRU cache
//!
//! Entries live in an [`lru::LruCache`] behind one mutex. Recency is updated
//! on every hit and insert, and the least recently used entry is evicted when
//! an insert would exceed capacity. Expiry is lazy: a read that finds an
//! entry older than the TTL removes it and reports a miss.
//! [`TtlLruCache::sweep_expired`] removes the rest on demand.

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::config::CacheConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::error::ConfigResult;
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe bounded cache with LRU eviction and TTL expiry
///
/// # Type Parameters
/// - `K`: Key type
/// - `V`: Value type, cloned out on hits
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use relay_common::cache::{CacheConfig, TtlLruCache};
///
/// let cache: TtlLruCache<String, i32> = TtlLruCache::new(CacheConfig::lru(100)).unwrap();
/// cache.insert("key".to_string(), 42);
/// assert_eq!(cache.get(&"key".to_string()), Some(42));
/// ```
pub struct TtlLruCache<K, V, C = SystemClock>
where
    K: Eq + Hash,
    C: Clock,
{
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V, C> fmt::Debug for TtlLruCache<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlLruCache")
            .field("config", &self.config)
            .field("len", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlLruCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> TtlLruCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> ConfigResult<Self> {
        let capacity = config.capacity()?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            metrics: MetricsCollector::default(),
            clock,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert or overwrite a value, evicting the least recently used entry
    /// when the cache is full.
    pub fn insert(&self, key: K, value: V) {
        let entry = CacheEntry { value, inserted_at: self.clock.now() };
        let mut entries = self.entries.lock();

        let replacing = entries.contains(&key);
        if entries.push(key, entry).is_some() && !replacing {
            self.metrics.record_eviction();
            debug!(max_size = self.config.max_size, "Evicted least recently used cache entry");
        }
        self.metrics.record_insert();
    }

    /// Get a value from the cache
    ///
    /// Returns `None` if the key is absent or its entry has outlived the TTL;
    /// an expired entry is removed as part of the lookup. A hit marks the
    /// entry as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.peek(key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                self.metrics.record_miss();
                return None;
            }
        };

        if expired {
            entries.pop(key);
            self.metrics.record_miss();
            self.metrics.record_expirations(1);
            return None;
        }

        let value = entries.get(key).map(|entry| entry.value.clone());
        self.metrics.record_hit();
        value
    }

    /// Clear all entries and reset statistics
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.metrics.reset();
    }

    /// Number of resident entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry
    ///
    /// Idempotent; returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        if self.config.ttl.is_none() {
            return 0;
        }

        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        let removed = expired.len();
        if removed > 0 {
            self.metrics.record_expirations(removed as u64);
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let (size, active_entries) = {
            let entries = self.entries.lock();
            let active = entries.iter().filter(|(_, entry)| !self.is_expired(entry, now)).count();
            (entries.len(), active)
        };

        let mut stats = CacheStats {
            size,
            active_entries,
            max_size: self.config.max_size,
            ttl_secs: self.config.ttl.map(|ttl| ttl.as_secs()),
            ..CacheStats::default()
        };
        self.metrics.fill(&mut stats);
        stats
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        self.config.ttl.is_some_and(|ttl| age(entry, now) > ttl)
    }
}

fn age<V>(entry: &CacheEntry<V>, now: Instant) -> Duration {
    now.saturating_duration_since(entry.inserted_at)
}
