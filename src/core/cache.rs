use std::time::Duration;

use moka::future::Cache;

use crate::core::hash::Fingerprint;
use crate::models::comparison::ComparisonResult;

/// Longest entry lifetime the cache accepts
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache sizing and expiry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached comparisons
    pub max_entries: u64,
    /// Lifetime of an entry, counted from insertion
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(300),
        }
    }
}

/// Bounded, time-expiring store of comparison results.
#[derive(Clone, Debug)]
pub struct ResultCache {
    inner: Cache<Fingerprint, ComparisonResult>,
}

impl ResultCache {
    /// Create a cache from its configuration. A TTL above [`MAX_TTL`] is capped.
    pub fn new(config: CacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl.min(MAX_TTL))
            .build();

        Self { inner }
    }

    /// Look up a live entry
    pub async fn get(&self, key: &Fingerprint) -> Option<ComparisonResult> {
        self.inner.get(key).await
    }

    /// Store a result, replacing any previous one for the key
    pub async fn insert(&self, key: Fingerprint, value: ComparisonResult) {
        self.inner.insert(key, value).await;
    }

    /// Number of entries, after applying pending evictions
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// True if no entries are held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
