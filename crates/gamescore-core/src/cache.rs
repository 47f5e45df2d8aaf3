//! Bounded in-memory cache with per-entry TTL and LRU eviction
//!
//! Used to memoize short-lived read queries (public event lists, event
//! details, scoreboards). Entries are process-local and vanish on restart.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Recency stamp; also the entry's key in `Inner::order`
    touched: u64,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency stamp -> key, oldest first
    order: BTreeMap<u64, String>,
    clock: u64,
}

impl<V> Inner<V> {
    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.touched);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> bool {
        match self.order.pop_first() {
            Some((_, key)) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

/// TTL cache keyed by string
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache holding at most `max_size` entries (minimum 1)
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                clock: 0,
            }),
            max_size: max_size.max(1),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a live value, refreshing its recency. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) => now > entry.expires_at,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            inner.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let stamp = inner.next_stamp();
        let Inner { entries, order, .. } = &mut *inner;
        let entry = entries.get_mut(key)?;
        order.remove(&entry.touched);
        order.insert(stamp, key.to_string());
        entry.touched = stamp;

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Insert or replace a value. `None` or a zero TTL uses the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        let mut inner = self.lock();

        if inner.remove(&key).is_none() && inner.entries.len() >= self.max_size {
            if inner.evict_oldest() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let stamp = inner.next_stamp();
        inner.order.insert(stamp, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                touched: stamp,
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Delete every key containing `pattern`, returning how many were removed
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| k.contains(pattern))
            .cloned()
            .collect();
        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including ones that expired but were not yet read
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

/// Read-through helper: serve `key` from `cache`, or await `fetcher` and
/// store its result when it is `Some`.
///
/// Errors from the fetcher are returned untouched and nothing is cached.
/// Concurrent misses on the same key are not coalesced; each runs its own
/// fetch and the last writer wins.
pub async fn with_cache<V, E, F, Fut>(
    cache: &TtlCache<V>,
    key: &str,
    ttl: Option<Duration>,
    fetcher: F,
) -> Result<Option<V>, E>
where
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<V>, E>>,
{
    if let Some(value) = cache.get(key) {
        debug!("Cache HIT: {}", key);
        return Ok(Some(value));
    }

    debug!("Cache MISS: {}", key);
    let value = fetcher().await?;
    if let Some(value) = &value {
        cache.set(key, value.clone(), ttl);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn cache(max_size: usize) -> TtlCache<i32> {
        TtlCache::new(max_size, Duration::from_secs(60))
    }

    #[test]
    fn test_basic_operations() {
        let cache = cache(10);

        assert_eq!(cache.get("missing"), None);

        cache.set("a", 1, None);
        assert_eq!(cache.get("a"), Some(1));

        cache.set("a", 2, None);
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let cache = cache(2);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("c", 3, None);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = cache(2);
        cache.set("a", 1, None);
        cache.set("b", 2, None);

        // "a" becomes most recently used, so "b" is the eviction victim
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3, None);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_replacing_existing_key_at_capacity_does_not_evict() {
        let cache = cache(2);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("a", 10, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = cache(0);
        cache.set("a", 1, None);
        assert_eq!(cache.max_size(), 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = cache(10);
        cache.set("short", 1, Some(Duration::from_millis(100)));
        cache.set("default", 2, None);

        assert_eq!(cache.get("short"), Some(1));

        tokio::time::advance(Duration::from_millis(101)).await;
        assert_eq!(cache.get("short"), None);
        // Expiry check is idempotent and removes the entry
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("default"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_uses_default() {
        let cache = TtlCache::new(10, Duration::from_secs(5));
        cache.set("k", "v", Some(Duration::ZERO));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k"), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_invalidate_pattern_and_clear() {
        let cache = cache(10);
        cache.set("event:42", 1, None);
        cache.set("scoreboard:42", 2, None);
        cache.set("scoreboard:7", 3, None);

        assert_eq!(cache.invalidate_pattern("42"), 2);
        assert_eq!(cache.get("scoreboard:7"), Some(3));
        assert_eq!(cache.invalidate_pattern("nothing"), 0);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("scoreboard:7"), None);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = cache(10);
        cache.set("a", 1, None);
        cache.get("a");
        cache.get("a");
        cache.get("b");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_with_cache_fetches_once() {
        let cache = cache(10);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = with_cache(&cache, "k", None, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(7))
            })
            .await
            .unwrap();
            assert_eq!(value, Some(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_cache_skips_none_and_errors() {
        let cache = cache(10);

        let value = with_cache(&cache, "none", None, || async { Ok::<_, String>(None) })
            .await
            .unwrap();
        assert_eq!(value, None);
        assert_eq!(cache.get("none"), None);

        let err = with_cache(&cache, "err", None, || async {
            Err::<Option<i32>, _>("db down".to_string())
        })
        .await
        .unwrap_err();
        assert_eq!(err, "db down");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_cache_honours_ttl() {
        let cache = cache(10);
        with_cache(&cache, "k", Some(Duration::from_secs(1)), || async {
            Ok::<_, String>(Some(1))
        })
        .await
        .unwrap();

        tokio::time::advance(Duration::from_millis(1001)).await;

        let value = with_cache(&cache, "k", None, || async { Ok::<_, String>(Some(2)) })
            .await
            .unwrap();
        assert_eq!(value, Some(2));
    }
}
