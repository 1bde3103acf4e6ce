//! Cache-aside policy for search results.
//!
//! Every operation here is best-effort: backend failures, missing entries
//! and undecodable payloads all degrade to "not cached" and are logged,
//! never returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use shelf_core::PageRequest;

use super::keys::{search_key, search_pattern};
use super::traits::{CacheBackend, CacheStats};

/// Default lifetime of a cached search page.
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
}

/// Search-result cache for one resource kind.
#[derive(Clone)]
pub struct SearchCache {
    backend: Arc<dyn CacheBackend>,
    resource_kind: &'static str,
    ttl: Duration,
    counters: Arc<Counters>,
}

impl SearchCache {
    pub fn new(backend: Arc<dyn CacheBackend>, resource_kind: &'static str, ttl: Duration) -> Self {
        Self {
            backend,
            resource_kind,
            ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Key for one page of results for `query`.
    pub fn key(&self, query: &str, page: PageRequest) -> String {
        search_key(self.resource_kind, query, page)
    }

    /// Pattern covering every cached page for this resource kind.
    pub fn pattern(&self) -> String {
        search_pattern(self.resource_kind)
    }

    /// Look up a cached value. `None` means "go to the repository".
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Search cache miss");
                return None;
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Search cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Search cache hit");
                Some(value)
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Discarding undecodable search cache entry");
                None
            }
        }
    }

    /// Write `value` under `key` with the configured TTL.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Failed to encode search results for cache");
                return;
            }
        };

        match self.backend.set(key, bytes, self.ttl).await {
            Ok(()) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Search cache write failed");
            }
        }
    }

    /// Drop every cached search page for this resource kind.
    ///
    /// Returns the number of keys removed, or 0 if the backend failed.
    pub async fn invalidate(&self) -> u64 {
        let pattern = self.pattern();
        match self.backend.delete_by_pattern(&pattern).await {
            Ok(removed) => {
                self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(pattern = %pattern, removed, "Invalidated search cache");
                removed
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(pattern = %pattern, error = %e, "Search cache invalidation failed");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("resource_kind", &self.resource_kind)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}
