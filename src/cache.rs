//! Two-level lookup cache
//!
//! Lookup type → key → aggregated result. The outer level is a size-bounded
//! LRU of per-type caches; each inner cache is size-bounded LRU with a
//! time-to-live. Both levels coalesce concurrent fills for the same key, so
//! one NetBox computation runs per `(lookup type, key)` at a time.
//!
//! moka applies size bounds during its maintenance pass, so every fill runs
//! that pass before returning. Once a fill completes its level holds at most
//! its configured number of entries, least recently used evicted first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::config::EnrichSettings;
use crate::error::Result;
use crate::lookup::LookupType;
use crate::normalize::AggregatedResult;

/// A cached lookup outcome; `None` records a lookup that found nothing
pub type CachedResult = Option<Arc<AggregatedResult>>;

type KeyCache = Cache<String, CachedResult>;

pub struct LookupCache {
    lookups: Cache<LookupType, KeyCache>,
    cache_size: u64,
    cache_ttl: Duration,
}

impl LookupCache {
    pub fn new(lookup_cache_size: u64, cache_size: u64, cache_ttl: Duration) -> Self {
        Self {
            lookups: Cache::builder()
                .max_capacity(lookup_cache_size)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            cache_size,
            cache_ttl,
        }
    }

    pub fn from_settings(settings: &EnrichSettings) -> Self {
        Self::new(
            settings.lookup_cache_size,
            settings.cache_size,
            settings.cache_ttl,
        )
    }

    /// Return the cached result for `key`, running `compute` on a miss.
    ///
    /// Concurrent callers for the same key wait for a single `compute`.
    /// Errors are not cached; every waiter receives the shared error.
    pub async fn get_or_compute<F, Fut>(
        &self,
        lookup: LookupType,
        key: &str,
        compute: F,
    ) -> Result<CachedResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedResult>>,
    {
        let keys = self.key_cache(lookup).await;
        let mut filled = false;
        let result = keys
            .try_get_with(key.to_string(), async {
                tracing::debug!(lookup_type = %lookup, key, "Lookup cache miss");
                filled = true;
                compute().await
            })
            .await;
        if filled {
            keys.run_pending_tasks().await;
        }
        Ok(result?)
    }

    async fn key_cache(&self, lookup: LookupType) -> KeyCache {
        let mut built = false;
        let keys = self
            .lookups
            .get_with(lookup, async {
                built = true;
                Cache::builder()
                    .max_capacity(self.cache_size)
                    .time_to_live(self.cache_ttl)
                    .eviction_policy(EvictionPolicy::lru())
                    .build()
            })
            .await;
        if built {
            self.lookups.run_pending_tasks().await;
        }
        keys
    }

    /// Number of per-type caches
    pub fn lookup_count(&self) -> u64 {
        self.lookups.entry_count()
    }

    /// Number of cached keys for a lookup type
    pub async fn entry_count(&self, lookup: LookupType) -> u64 {
        match self.lookups.get(&lookup).await {
            Some(keys) => keys.entry_count(),
            None => 0,
        }
    }

    /// Apply pending evictions and expirations at both levels
    pub async fn run_pending_tasks(&self) {
        self.lookups.run_pending_tasks().await;
        for (_, keys) in self.lookups.iter() {
            keys.run_pending_tasks().await;
        }
    }

    pub fn invalidate_all(&self) {
        self.lookups.invalidate_all();
    }
}
