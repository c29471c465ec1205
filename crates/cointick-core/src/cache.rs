//! In-memory response caching with TTL expiry and LRU eviction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Defines how a caller uses the cache around an upstream call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a live entry if present; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Neither read nor write the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Entries dropped to make room for a new key.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
    pub size: usize,
    pub max_size: usize,
    pub total_requests: u64,
    /// `hits / (hits + misses)`, or `0.0` before any lookup.
    pub hit_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    expirations: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past the clock's range.
    expires_at: Option<Instant>,
    touched: u64,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // touch tick -> key; the first entry is the least recently used
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    counters: Counters,
}

impl<V> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            counters: Counters::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick = self.next_tick.wrapping_add(1);
        tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.touched);
            entry.touched = tick;
            self.recency.insert(tick, key.to_owned());
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.touched);
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        self.counters.expirations += expired.len() as u64;
        expired.len()
    }

    fn evict_least_recent(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        self.counters.evictions += 1;
        Some(key)
    }
}

/// Thread-safe TTL + LRU cache shared between concurrent callers.
///
/// Cloning yields another handle to the same storage. The TTL is fixed per
/// instance; a zero TTL produces a disabled cache that never stores.
#[derive(Debug)]
pub struct ResponseCache<V = String> {
    ttl: Duration,
    max_size: usize,
    inner: Arc<Mutex<CacheInner<V>>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            max_size: self.max_size,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `max_size` entries (minimum 1) for `ttl` each.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        tracing::info!(ttl_secs = ttl.as_secs_f64(), max_size, "initialized response cache");
        Self {
            ttl,
            max_size,
            inner: Arc::new(Mutex::new(CacheInner::new())),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 1)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up a live entry. Hits refresh the entry's recency.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        let live = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                inner.remove(key);
                inner.counters.expirations += 1;
                None
            }
            None => None,
        };

        match live {
            Some(value) => {
                inner.counters.hits += 1;
                inner.touch(key);
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            None => {
                inner.counters.misses += 1;
                tracing::debug!(key, "cache miss");
                None
            }
        }
    }

    /// Store `value`, evicting the least recently used entry when full.
    ///
    /// Expired entries are purged first, so a live entry is only evicted when
    /// the cache is genuinely at capacity. No-op on a disabled cache.
    pub fn set(&self, key: impl Into<String>, value: V) {
        if self.is_disabled() {
            return;
        }

        let key = key.into();
        let now = Instant::now();
        let mut inner = self.lock();

        inner.purge_expired(now);
        if inner.remove(&key).is_none() && inner.entries.len() >= self.max_size {
            if let Some(evicted) = inner.evict_least_recent() {
                tracing::debug!(key = %evicted, "evicted least recently used entry");
            }
        }

        let touched = inner.tick();
        inner.recency.insert(touched, key.clone());
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                expires_at: now.checked_add(self.ttl),
                touched,
            },
        );
        inner.counters.sets += 1;
        tracing::debug!(key = %key, "cache set");
    }

    /// Remove one entry. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.lock().remove(key).is_some();
        if removed {
            tracing::debug!(key, "cache delete");
        }
        removed
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.recency.clear();
        tracing::info!("cache cleared");
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.lock();
        let matching: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            inner.remove(key);
        }
        tracing::info!(prefix, count = matching.len(), "invalidated cache keys by prefix");
        matching.len()
    }

    /// Remove entries whose TTL has elapsed and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(Instant::now())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let counters = inner.counters;
        let total_requests = counters.hits + counters.misses;
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            counters.hits as f64 / total_requests as f64
        };

        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            evictions: counters.evictions,
            expirations: counters.expirations,
            size: inner.entries.len(),
            max_size: self.max_size,
            total_requests,
            hit_rate,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().expect("response cache lock is not poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn basic_operations() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_secs(60), 10);

        assert!(cache.get("key1").is_none());

        cache.set("key1", String::from("value1"));
        assert_eq!(cache.get("key1"), Some(String::from("value1")));

        cache.set("key1", String::from("value2"));
        assert_eq!(cache.get("key1"), Some(String::from("value2")));
        assert_eq!(cache.len(), 1);

        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_invisible_and_counted() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_millis(100), 10);

        cache.set("key1", String::from("value1"));
        tokio::time::advance(Duration::from_millis(150)).await;

        assert!(cache.get("key1").is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_drops_only_stale_entries() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_millis(100), 10);

        cache.set("old", String::from("a"));
        tokio::time::advance(Duration::from_millis(60)).await;
        cache.set("new", String::from("b"));
        tokio::time::advance(Duration::from_millis(60)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_and_prefix_invalidation_keep_counters() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_secs(60), 10);

        cache.set("quotes:1", String::from("a"));
        cache.set("quotes:2", String::from("b"));
        cache.set("listings:1", String::from("c"));
        let _ = cache.get("quotes:1");
        let _ = cache.get("missing");

        assert_eq!(cache.invalidate_by_prefix("quotes:"), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 3);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_beyond_the_clock_range_never_expires() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_secs(u64::MAX), 10);

        cache.set("k", String::from("v"));
        tokio::time::advance(Duration::from_secs(365 * 24 * 3_600)).await;

        assert_eq!(cache.get("k"), Some(String::from("v")));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache: ResponseCache = ResponseCache::disabled();

        assert!(cache.is_disabled());
        cache.set("key1", String::from("value1"));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().sets, 0);
    }

    #[test]
    fn hit_rate_is_zero_before_any_lookup() {
        let cache: ResponseCache = ResponseCache::new(Duration::from_secs(1), 1);
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[test]
    fn cache_mode_default_reads_and_writes() {
        let mode = CacheMode::default();
        assert_eq!(mode, CacheMode::Use);
        assert!(mode.reads() && mode.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}
