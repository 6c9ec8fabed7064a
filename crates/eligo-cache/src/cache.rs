//! Lookup cache with LRU eviction, per-entry TTL and single-flight computation.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::expiry::ExpiryTracker;

/// Values that can be stored in a [`LookupCache`].
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Whether this value is a negative answer.
    ///
    /// Negative answers use [`CacheConfig::negative_ttl`].
    fn is_negative(&self) -> bool {
        false
    }
}

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// When this entry was stored.
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry stamped with the current time.
    pub fn new(value: V) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }
}

type Computation<V, E> = BoxFuture<'static, Result<V, E>>;

/// Inner state protected by a mutex. Never held across an await.
struct CacheInner<V, E> {
    /// LRU map of completed lookups.
    lru: LruCache<String, CacheEntry<V>>,

    /// Expiry deadlines.
    expiry: ExpiryTracker,

    /// Computations currently running, by key.
    ///
    /// Held weakly: when every waiter goes away the computation is dropped
    /// and the next caller starts a fresh one.
    inflight: HashMap<String, WeakShared<Computation<V, E>>>,

    hits: u64,
    misses: u64,
    joined: u64,
}

impl<V: CacheValue, E> CacheInner<V, E> {
    /// Return a live entry, dropping it first if it has expired.
    fn lookup(&mut self, key: &str) -> Option<V> {
        if self.expiry.is_expired(key) {
            debug!(key = %key, "Cache entry expired, removing");
            self.lru.pop(key);
            self.expiry.remove(key);
            return None;
        }

        let value = self.lru.get(key).map(|entry| entry.value.clone())?;
        self.hits += 1;
        trace!(key = %key, "Cache hit");
        Some(value)
    }

    fn store(&mut self, key: String, value: V, ttl: Option<Duration>) {
        if !self.lru.contains(&key) && self.lru.len() >= self.lru.cap().get() {
            if let Some((evicted, _)) = self.lru.peek_lru() {
                let evicted = evicted.clone();
                debug!(key = %evicted, "Evicting LRU entry to make room");
                self.expiry.remove(&evicted);
            }
        }

        self.expiry.set(&key, ttl);
        self.lru.put(key, CacheEntry::new(value));
    }
}

/// Memoizing cache in front of an expensive, failure-prone computation.
///
/// - `Ok` results are stored; `Err` results are handed back to every waiter
///   but never stored, so a fault cannot poison the cache.
/// - Concurrent calls for the same key share one computation.
/// - Entries are evicted least-recently-used once `capacity` is exceeded,
///   and expire after the TTL matching their polarity.
pub struct LookupCache<V, E> {
    inner: Arc<Mutex<CacheInner<V, E>>>,
    config: CacheConfig,
}

impl<V, E> LookupCache<V, E>
where
    V: CacheValue,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new cache.
    pub fn new(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);

        let inner = CacheInner {
            lru: LruCache::new(cap),
            expiry: ExpiryTracker::new(),
            inflight: HashMap::new(),
            hits: 0,
            misses: 0,
            joined: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the current number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Return the cached value for `key`, or compute it.
    ///
    /// On a hit `compute` is not called. On a miss, if another caller is
    /// already computing this key, this call waits for that computation
    /// instead of starting its own. `compute` runs without the cache lock
    /// held, so it may call back into this cache.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(found) = self.join_existing(key) {
            return found.await;
        }

        let fresh = self.computation(key, compute());

        let shared = {
            let mut inner = self.inner.lock();

            // Another caller may have started or finished this key meanwhile.
            if let Some(value) = inner.lookup(key) {
                return Ok(value);
            }
            match inner.inflight.get(key).and_then(WeakShared::upgrade) {
                Some(running) => {
                    inner.joined += 1;
                    debug!(key = %key, "Joining computation started concurrently");
                    running
                }
                None => {
                    inner.misses += 1;
                    debug!(key = %key, "Cache miss, starting computation");
                    if let Some(weak) = fresh.downgrade() {
                        inner.inflight.insert(key.to_string(), weak);
                    }
                    fresh
                }
            }
        };

        shared.await
    }

    /// A ready hit or a running computation for `key`, if there is one.
    fn join_existing(&self, key: &str) -> Option<BoxFuture<'static, Result<V, E>>> {
        let mut inner = self.inner.lock();

        if let Some(value) = inner.lookup(key) {
            return Some(futures::future::ready(Ok(value)).boxed());
        }

        let running = inner.inflight.get(key).and_then(WeakShared::upgrade)?;
        inner.joined += 1;
        debug!(key = %key, "Joining in-flight computation");
        Some(running.boxed())
    }

    /// Wrap a computation so that whoever drives it to completion also
    /// records the result.
    fn computation<Fut>(&self, key: &str, fut: Fut) -> Shared<Computation<V, E>>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();
        let key = key.to_string();

        let wrapped: Computation<V, E> = async move {
            let result = fut.await;
            {
                let mut inner = inner.lock();
                inner.inflight.remove(&key);
                match &result {
                    Ok(value) => {
                        let ttl = config.ttl_for(value.is_negative());
                        inner.store(key.clone(), value.clone(), ttl);
                        trace!(key = %key, cache_size = inner.lru.len(), "Result stored");
                    }
                    Err(_) => {
                        debug!(key = %key, "Computation failed, result not cached");
                    }
                }
            }
            result
        }
        .boxed();

        wrapped.shared()
    }

    /// Insert a value directly, bypassing computation.
    pub fn insert(&self, key: &str, value: V) {
        let ttl = self.config.ttl_for(value.is_negative());
        self.inner.lock().store(key.to_string(), value, ttl);
    }

    /// Check if a live entry exists for `key` (without touching LRU order).
    pub fn contains(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        inner.lru.contains(key) && !inner.expiry.is_expired(key)
    }

    /// Peek at a value without updating LRU order.
    pub fn peek(&self, key: &str) -> Option<V> {
        let inner = self.inner.lock();
        if inner.expiry.is_expired(key) {
            None
        } else {
            inner.lru.peek(key).map(|entry| entry.value.clone())
        }
    }

    /// Remove an entry so the next lookup recomputes it.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.expiry.remove(key);
        let removed = inner.lru.pop(key).is_some();
        if removed {
            debug!(key = %key, "Cache entry invalidated");
        }
        removed
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired = inner.expiry.drain_expired();
        let mut count = 0;

        // Computations abandoned by every waiter leave a dead handle behind.
        inner.inflight.retain(|_, weak| weak.upgrade().is_some());

        for key in expired {
            if inner.lru.pop(&key).is_some() {
                count += 1;
            }
        }

        if count > 0 {
            debug!(count = count, "Cleaned up expired cache entries");
        }

        count
    }

    /// Spawn the periodic cleanup task, if enabled and anything can expire.
    pub fn spawn_cleanup_task(&self) -> Option<JoinHandle<()>> {
        if !self.config.enable_cleanup_task || !self.config.expires() {
            return None;
        }

        let cache = self.clone();
        let interval = self.config.cleanup_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.cleanup_expired();
            }
        }))
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.lru.len(),
            capacity: self.config.capacity,
            hits: inner.hits,
            misses: inner.misses,
            joined: inner.joined,
            in_flight: inner
                .inflight
                .values()
                .filter(|weak| weak.upgrade().is_some())
                .count(),
            expiring: inner.expiry.len(),
        }
    }
}

impl<V, E> Clone for LookupCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached entries.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that started a computation.
    pub misses: u64,

    /// Lookups that joined another caller's computation.
    pub joined: u64,

    /// Computations currently running.
    pub in_flight: usize,

    /// Entries with an expiry deadline.
    pub expiring: usize,
}
