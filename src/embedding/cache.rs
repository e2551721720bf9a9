//! Time-bounded cache for query embeddings.
//!
//! Maps a normalized query to a previously computed embedding vector
//! so repeated or racing queries skip the embedding provider. Entries
//! expire after a fixed TTL (default one hour) and are purged lazily
//! on the access that finds them stale; an LRU capacity bound keeps
//! the process-wide cache from growing without limit.
//!
//! Cache absence is always a normal branch, never an error, and there
//! is no negative caching. Two in-flight queries with the same key may
//! race between miss-detection and insertion; last write wins and the
//! duplicate provider call is tolerated.

use crate::models::normalize_query;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Configuration for the embedding cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays valid.
    pub ttl: Duration,
    /// Maximum number of entries before LRU eviction.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            capacity: 1024,
        }
    }
}

impl CacheConfig {
    /// Creates a cache configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            capacity: 1024,
        }
    }

    /// Sets the entry TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the capacity bound.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// A cached embedding with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry {
    vector: Vec<f32>,
    inserted_at: Instant,
}

/// Process-wide embedding cache.
///
/// Constructed once at startup and shared by reference (typically
/// `Arc`) across in-flight retrievals. Interior mutability keeps the
/// API `&self`; the mutex guards short map operations only.
#[derive(Debug)]
pub struct EmbeddingCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

/// Helper to acquire the cache lock with poison recovery.
fn acquire_lock<'a>(
    mutex: &'a Mutex<LruCache<String, CacheEntry>>,
) -> MutexGuard<'a, LruCache<String, CacheEntry>> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("embedding cache mutex was poisoned, recovering");
            metrics::counter!("embedding_cache_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        }
    }
}

impl EmbeddingCache {
    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// Cache key: hex SHA-256 of the normalized query text.
    fn key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalize_query(query).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the cached embedding for a query, if present and fresh.
    ///
    /// An expired entry is treated as absent and purged on the spot.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        let key = Self::key(query);
        let mut entries = acquire_lock(&self.entries);

        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                metrics::counter!("embedding_cache_hits_total").increment(1);
                tracing::trace!(key = %key, "embedding cache hit");
                Some(entry.vector.clone())
            }
            Some(_) => {
                entries.pop(&key);
                metrics::counter!("embedding_cache_evictions_total", "reason" => "expired")
                    .increment(1);
                metrics::counter!("embedding_cache_misses_total").increment(1);
                tracing::trace!(key = %key, "embedding cache entry expired");
                None
            }
            None => {
                metrics::counter!("embedding_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Stores an embedding for a query, overwriting any prior entry.
    pub fn put(&self, query: &str, vector: Vec<f32>) {
        let key = Self::key(query);
        let mut entries = acquire_lock(&self.entries);
        entries.put(
            key,
            CacheEntry {
                vector,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of live entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        acquire_lock(&self.entries).len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        acquire_lock(&self.entries).is_empty()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
