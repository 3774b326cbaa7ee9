//! LRU memo for query rewrites.
//!
//! Finished rewrites live in the LRU. Computations still in flight live in
//! a separate pending map, so they never count toward capacity and cannot
//! be evicted half-way. Concurrent callers for the same raw query share one
//! pending cell and receive its outcome, failure included. The map lock is
//! only held for bookkeeping, never across the computation.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

/// Default number of memoized rewrites.
pub const DEFAULT_REWRITE_CACHE_SIZE: usize = 1000;

/// Outcome of one computation, shared with every caller that waited on it.
type Pending = Arc<OnceCell<Result<String, String>>>;

/// How a cached value was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Already resident, or computed by a concurrent caller we waited on.
    Hit(String),
    /// Computed by this call.
    Computed(String),
}

impl Lookup {
    pub fn into_value(self) -> String {
        match self {
            Self::Hit(value) | Self::Computed(value) => value,
        }
    }
}

/// Cache statistics for monitoring and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entries {
    resident: LruCache<String, String>,
    pending: HashMap<String, Pending>,
}

/// Thread-safe, capacity-bounded rewrite memo.
pub struct RewriteCache {
    entries: Mutex<Entries>,
    stats: Mutex<CacheStats>,
}

impl Default for RewriteCache {
    fn default() -> Self {
        Self::new(DEFAULT_REWRITE_CACHE_SIZE)
    }
}

impl RewriteCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                resident: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Return the value for `key`, running `compute` on a miss.
    ///
    /// Concurrent callers for the same key share a single run of `compute`
    /// and all receive its result. A failure is reported to every one of
    /// them as the rendered error, and nothing is memoized, so the next
    /// call after it tries again.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Lookup, String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Display,
    {
        let pending = {
            let mut entries = self.entries.lock();
            if let Some(value) = entries.resident.get(key) {
                let value = value.clone();
                drop(entries);
                self.stats.lock().hits += 1;
                return Ok(Lookup::Hit(value));
            }
            Arc::clone(entries.pending.entry(key.to_string()).or_default())
        };

        // If the running caller is dropped, the next waiter runs its own
        // `compute` in its place.
        let mut ran = false;
        let outcome = pending
            .get_or_init(|| {
                ran = true;
                async move { compute().await.map_err(|err| err.to_string()) }
            })
            .await
            .clone();

        if !ran {
            if outcome.is_ok() {
                self.stats.lock().hits += 1;
            }
            return outcome.map(Lookup::Hit);
        }

        {
            let mut entries = self.entries.lock();
            if entries
                .pending
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &pending))
            {
                entries.pending.remove(key);
            }
            if let Ok(value) = &outcome {
                entries.resident.put(key.to_string(), value.clone());
            }
        }

        let mut stats = self.stats.lock();
        match outcome {
            Ok(value) => {
                stats.misses += 1;
                Ok(Lookup::Computed(value))
            }
            Err(reason) => {
                stats.failures += 1;
                Err(reason)
            }
        }
    }

    /// Peek at a resident value without touching recency or statistics.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().resident.peek(key).cloned()
    }

    /// Number of resident entries; in-flight computations are not counted.
    pub fn len(&self) -> usize {
        self.entries.lock().resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().resident.cap().get()
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.entries.lock().pending.len()
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn clear(&self) {
        self.entries.lock().resident.clear();
        *self.stats.lock() = CacheStats::default();
    }
}
