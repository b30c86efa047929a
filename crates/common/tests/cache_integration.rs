//! Integration tests for the TTL + LRU cache
//!
//! Exercises eviction, expiry and concurrent access through the public API.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_common::cache::{CacheConfig, TtlLruCache};
use relay_common::resilience::MockClock;

/// Validates pure LRU order with a capacity of two.
///
/// # Test Steps
/// 1. Insert A then B
/// 2. Read A so B becomes least recently used
/// 3. Insert C
/// 4. Verify B was evicted and A, C remain
#[test]
fn test_lru_eviction_follows_access_not_insertion() {
    let cache: TtlLruCache<&'static str, &'static str> =
        TtlLruCache::new(CacheConfig::lru(2)).expect("valid config");

    cache.insert("A", "alpha");
    cache.insert("B", "beta");
    assert_eq!(cache.get(&"A"), Some("alpha"));
    cache.insert("C", "gamma");

    assert_eq!(cache.get(&"B"), None);
    assert_eq!(cache.get(&"A"), Some("alpha"));
    assert_eq!(cache.get(&"C"), Some("gamma"));
}

/// Validates the TTL boundary: hit at `ttl - 1`, miss at `ttl + 1`.
#[test]
fn test_ttl_boundary_hit_then_miss() {
    let clock = MockClock::new();
    let ttl = Duration::from_secs(3600);
    let cache: TtlLruCache<String, String, MockClock> =
        TtlLruCache::with_clock(CacheConfig::ttl_lru(ttl, 100), clock.clone())
            .expect("valid config");

    cache.insert("k".to_string(), "v".to_string());

    clock.set_elapsed(ttl - Duration::from_secs(1));
    assert_eq!(cache.get(&"k".to_string()).as_deref(), Some("v"));

    clock.set_elapsed(ttl + Duration::from_secs(1));
    assert_eq!(cache.get(&"k".to_string()), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.size, 0);
}

/// Validates that capacity holds under concurrent writers and readers.
#[test]
fn test_concurrent_access_respects_capacity() {
    let cache: Arc<TtlLruCache<String, usize>> =
        Arc::new(TtlLruCache::new(CacheConfig::lru(50)).expect("valid config"));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("{worker}-{i}");
                    cache.insert(key.clone(), i);
                    let _ = cache.get(&key);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let stats = cache.stats();
    assert_eq!(stats.size, 50);
    assert_eq!(stats.inserts, 1600);
    assert_eq!(stats.evictions, 1550);
    assert_eq!(stats.hits + stats.misses, 1600);
}

/// Validates that the cache can be shared by tasks on one async runtime.
///
/// No lock is held across an await point, so interleaved tasks never block
/// each other.
#[test]
fn test_shared_between_async_tasks() {
    let cache: Arc<TtlLruCache<String, String>> =
        Arc::new(TtlLruCache::new(CacheConfig::lru(10)).expect("valid config"));

    tokio_test::block_on(async {
        let writer = {
            let cache = Arc::clone(&cache);
            async move {
                for i in 0..5 {
                    cache.insert(format!("prompt-{i}"), format!("answer-{i}"));
                    tokio::task::yield_now().await;
                }
            }
        };
        let reader = {
            let cache = Arc::clone(&cache);
            async move {
                for _ in 0..5 {
                    let _ = cache.get(&"prompt-0".to_string());
                    tokio::task::yield_now().await;
                }
            }
        };
        tokio::join!(writer, reader);
    });

    assert_eq!(cache.len(), 5);
    assert_eq!(cache.get(&"prompt-4".to_string()).as_deref(), Some("answer-4"));
}
