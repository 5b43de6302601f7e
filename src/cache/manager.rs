//! In-memory cache with LRU eviction, per-entry TTL, and single-flight loads
//!
//! Provides a `Cache` that bounds memory with a fixed entry capacity, bounds
//! staleness with a time-to-live applied at insert, and collapses concurrent
//! loads for the same key into one upstream call whose outcome is shared by
//! every waiter.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Errors raised when constructing an invalid [`CacheConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Capacity of zero would make every insert evict itself
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,

    /// A zero TTL would expire entries the instant they are stored
    #[error("cache ttl must be greater than zero")]
    ZeroTtl,
}

/// Immutable cache configuration, validated at construction
///
/// Read once when the cache is built; there is no way to change capacity or
/// TTL on a live cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    capacity: NonZeroUsize,
    ttl: Duration,
}

impl CacheConfig {
    /// Default maximum number of live entries
    pub const DEFAULT_CAPACITY: usize = 100;
    /// Default lifetime applied to newly stored entries
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    /// Creates a validated configuration
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be at least 1
    /// * `ttl` - Lifetime for stored entries, must be non-zero
    ///
    /// # Returns
    /// * `Ok(CacheConfig)` when both values are usable
    /// * `Err(CacheConfigError)` when either is zero
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, CacheConfigError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheConfigError::ZeroCapacity)?;
        if ttl.is_zero() {
            return Err(CacheConfigError::ZeroTtl);
        }
        Ok(Self { capacity, ttl })
    }

    /// Maximum number of live entries
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Lifetime applied to newly stored entries
    #[allow(dead_code)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
            .expect("default cache configuration is valid")
    }
}

/// Errors returned by [`Cache::get_or_load`]
#[derive(Debug, Error)]
pub enum CacheError<E>
where
    E: std::error::Error + 'static,
{
    /// The loader failed; the same error is shared with every caller that
    /// joined the load. Failures are never cached, so the next call for the
    /// key runs the loader again.
    #[error("load failed: {0}")]
    Load(#[source] Arc<E>),

    /// The caller running the load was cancelled before it produced a
    /// result. Joined waiters receive this instead of blocking; a retry
    /// starts a fresh load.
    #[error("in-flight load was cancelled")]
    Cancelled,
}

/// Lightweight cache statistics suitable for diagnostics output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Configured maximum number of entries
    pub capacity: usize,
    /// Configured entry lifetime
    pub ttl: Duration,
    /// Number of stored entries that have not yet expired
    pub entries: usize,
}

/// A stored value together with its expiry deadline
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Outcome of a shared load, fanned out to every waiter
type LoadOutcome<V, E> = Result<V, Arc<E>>;

/// Per-key bookkeeping while a load is outstanding: subscribing yields the
/// eventual outcome, and the channel closing without a message means the
/// leading caller was cancelled.
type Ticket<V, E> = broadcast::Sender<LoadOutcome<V, E>>;

struct Inner<K, V, E> {
    /// Stored entries in recency order; the LRU structure owns both the
    /// key->entry mapping and the eviction order
    entries: LruCache<K, Entry<V>>,
    /// Keys with a load currently outstanding
    in_flight: HashMap<K, Ticket<V, E>>,
}

/// Role this call plays for the key after consulting the cache state
enum Flight<V, E> {
    /// No other load is outstanding; this caller runs the loader
    Lead(Ticket<V, E>),
    /// Another caller is already loading; await its broadcast
    Join(broadcast::Receiver<LoadOutcome<V, E>>),
}

/// Removes the in-flight ticket if the leading caller never completed its
/// bookkeeping (i.e. its future was dropped mid-load). Dropping the last
/// sender closes the channel, which waiters observe as a cancelled load.
struct FlightGuard<'a, K, V, E>
where
    K: Eq + Hash,
{
    inner: &'a Mutex<Inner<K, V, E>>,
    key: &'a K,
    armed: bool,
}

impl<K, V, E> Drop for FlightGuard<'_, K, V, E>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().in_flight.remove(self.key);
        }
    }
}

/// Bounded key-to-value cache shared by concurrent callers
///
/// Callers supply a key and an async loader; the cache decides whether to
/// answer from memory, join an in-progress load, or run the loader itself.
/// All structural state sits behind one mutex that is held only for
/// bookkeeping, never across the loader await.
pub struct Cache<K, V, E> {
    config: CacheConfig,
    inner: Mutex<Inner<K, V, E>>,
}

impl<K, V, E> Cache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    E: std::error::Error + 'static,
{
    /// Creates an empty cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: LruCache::new(config.capacity),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Returns the cached value for `key`, loading it if needed
    ///
    /// A fresh entry is returned directly and becomes the most recently
    /// used. A missing or expired entry triggers a load: if another caller
    /// is already loading this key the result of that load is awaited and
    /// shared; otherwise `load` is invoked exactly once, its success stored
    /// with `expires_at = now + ttl` (evicting the least recently used
    /// entry first when at capacity), and its outcome delivered to every
    /// waiter. Failures are propagated and never cached.
    ///
    /// # Arguments
    /// * `key` - Stable identifier for the value
    /// * `load` - Zero-argument async function producing the value
    ///
    /// # Returns
    /// * `Ok(value)` on a hit or a successful load
    /// * `Err(CacheError::Load)` when the loader failed
    /// * `Err(CacheError::Cancelled)` when the loading caller was dropped
    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<V, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let flight = {
            let mut inner = self.inner.lock();
            let now = Instant::now();

            // Check freshness first so the expired case can remove the
            // entry without fighting the borrow of a live lookup.
            let fresh = inner.entries.peek(&key).map(|entry| entry.expires_at > now);
            match fresh {
                Some(true) => {
                    // `get` bumps the entry to most recently used
                    if let Some(entry) = inner.entries.get(&key) {
                        trace!(?key, "cache hit");
                        return Ok(entry.value.clone());
                    }
                }
                Some(false) => {
                    trace!(?key, "cache entry expired");
                    inner.entries.pop(&key);
                }
                None => {}
            }

            if let Some(ticket) = inner.in_flight.get(&key) {
                trace!(?key, "joining in-flight load");
                Flight::Join(ticket.subscribe())
            } else {
                trace!(?key, "cache miss, starting load");
                let (ticket, _) = broadcast::channel(1);
                inner.in_flight.insert(key.clone(), ticket.clone());
                Flight::Lead(ticket)
            }
        };

        match flight {
            Flight::Join(mut outcome) => match outcome.recv().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(CacheError::Load(error)),
                Err(_) => Err(CacheError::Cancelled),
            },
            Flight::Lead(ticket) => {
                let mut guard = FlightGuard {
                    inner: &self.inner,
                    key: &key,
                    armed: true,
                };

                // The only suspension point: no lock is held here.
                let outcome = load().await.map_err(Arc::new);

                {
                    let mut inner = self.inner.lock();
                    inner.in_flight.remove(&key);
                    if let Ok(value) = &outcome {
                        let entry = Entry {
                            value: value.clone(),
                            expires_at: Instant::now() + self.config.ttl,
                        };
                        if let Some((evicted, _)) = inner.entries.push(key.clone(), entry) {
                            debug!(key = ?evicted, "evicted least recently used entry");
                        }
                    }
                }
                guard.armed = false;

                // Waiters subscribed while the ticket was in the map, so
                // every one of them sees this single message.
                let _ = ticket.send(outcome.clone());
                outcome.map_err(CacheError::Load)
            }
        }
    }

    /// Drops all stored entries; outstanding loads are unaffected
    #[allow(dead_code)]
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        debug!("cache cleared");
    }

    /// Number of stored entries, including any that have expired but have
    /// not yet been evicted or re-accessed
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache currently stores no entries
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns statistics about the cache
    ///
    /// Only entries that have not expired are counted, so the figure is
    /// safe to surface in diagnostics even while stale entries still hold
    /// capacity slots.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let now = Instant::now();
        let entries = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .count();
        CacheStats {
            capacity: self.config.capacity(),
            ttl: self.config.ttl,
            entries,
        }
    }
}

impl<K, V, E> Default for Cache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    E: std::error::Error + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    #[error("load blew up: {0}")]
    struct TestError(String);

    fn test_cache(capacity: usize, ttl: Duration) -> Cache<String, String, TestError> {
        Cache::new(CacheConfig::new(capacity, ttl).expect("valid test config"))
    }

    /// Loads through the cache, recording whether the loader actually ran.
    async fn load_value(
        cache: &Cache<String, String, TestError>,
        key: &str,
        value: &str,
        calls: &AtomicUsize,
    ) -> Result<String, CacheError<TestError>> {
        cache
            .get_or_load(key.to_string(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            })
            .await
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let result = CacheConfig::new(0, Duration::from_secs(300));
        assert_eq!(result.unwrap_err(), CacheConfigError::ZeroCapacity);
    }

    #[test]
    fn test_config_rejects_zero_ttl() {
        let result = CacheConfig::new(100, Duration::ZERO);
        assert_eq!(result.unwrap_err(), CacheConfigError::ZeroTtl);
    }

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity(), 100);
        assert_eq!(config.ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_miss_loads_then_hit_skips_loader() {
        let cache = test_cache(10, Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        let first = load_value(&cache, "vancouver|centigrade", "18.2", &calls).await;
        assert_eq!(first.unwrap(), "18.2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second access is a hit; the loader value is ignored.
        let second = load_value(&cache, "vancouver|centigrade", "ignored", &calls).await;
        assert_eq!(second.unwrap(), "18.2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_exactly_at_ttl() {
        let cache = test_cache(10, Duration::from_secs(1));
        let calls = AtomicUsize::new(0);

        load_value(&cache, "k", "v1", &calls).await.unwrap();

        // Just before the deadline: still a hit.
        advance(Duration::from_millis(500)).await;
        let hit = load_value(&cache, "k", "v2", &calls).await.unwrap();
        assert_eq!(hit, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // At the deadline: a miss, and the reload replaces the value.
        advance(Duration::from_millis(500)).await;
        let reloaded = load_value(&cache, "k", "v2", &calls).await.unwrap();
        assert_eq!(reloaded, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lru_eviction_prefers_least_recently_used() {
        let cache = test_cache(2, Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        load_value(&cache, "a", "1", &calls).await.unwrap();
        load_value(&cache, "b", "2", &calls).await.unwrap();

        // Hit A so that B becomes the eviction candidate.
        load_value(&cache, "a", "ignored", &calls).await.unwrap();

        // Filling C evicts B, not A.
        load_value(&cache, "c", "3", &calls).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // A is still a hit; B requires a fresh load.
        load_value(&cache, "a", "ignored", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        load_value(&cache, "b", "2 again", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = test_cache(10, Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        let failed: Result<String, _> = cache
            .get_or_load("k".to_string(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError("upstream 502".into()))
            })
            .await;
        assert!(matches!(failed, Err(CacheError::Load(_))));
        assert_eq!(cache.len(), 0);

        // The next call retries the loader instead of replaying the error.
        let ok = load_value(&cache, "k", "recovered", &calls).await.unwrap();
        assert_eq!(ok, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_other_keys_intact() {
        let cache = test_cache(10, Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        load_value(&cache, "healthy", "ok", &calls).await.unwrap();

        let _: Result<String, _> = cache
            .get_or_load("broken".to_string(), || async {
                Err(TestError("boom".into()))
            })
            .await;

        let still_cached = load_value(&cache, "healthy", "ignored", &calls)
            .await
            .unwrap();
        assert_eq!(still_cached, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_occupies_slot_until_accessed() {
        let cache = test_cache(2, Duration::from_secs(1));
        let calls = AtomicUsize::new(0);

        load_value(&cache, "a", "1", &calls).await.unwrap();
        load_value(&cache, "b", "2", &calls).await.unwrap();

        advance(Duration::from_secs(2)).await;

        // Expiry is lazy: both slots are still held.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().entries, 0);

        // Accessing A reloads it; B's stale slot is untouched.
        load_value(&cache, "a", "fresh", &calls).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_clear_drops_all_entries() {
        let cache = test_cache(10, Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        load_value(&cache, "a", "1", &calls).await.unwrap();
        load_value(&cache, "b", "2", &calls).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        // Cleared keys load again.
        load_value(&cache, "a", "1", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stats_reports_configuration() {
        let cache = test_cache(7, Duration::from_secs(60));
        let stats = cache.stats();
        assert_eq!(stats.capacity, 7);
        assert_eq!(stats.ttl, Duration::from_secs(60));
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_load_error_is_shared_not_swallowed() {
        let cache = test_cache(10, Duration::from_secs(300));

        let result: Result<String, _> = cache
            .get_or_load("k".to_string(), || async {
                Err(TestError("city not found".into()))
            })
            .await;

        match result {
            Err(CacheError::Load(error)) => {
                assert_eq!(*error, TestError("city not found".into()));
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }
}
