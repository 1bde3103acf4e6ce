//! Cache backend trait and usage statistics.

use std::time::Duration;

use async_trait::async_trait;
use shelf_core::CacheError;

/// Byte-oriented key/value cache with per-entry TTL.
///
/// Backends only move bytes; encoding and the lookaside policy live in
/// [`SearchCache`](super::SearchCache).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read a value. Expired and absent entries both yield `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Delete every key matching a glob `pattern` (`*` and `?` wildcards).
    ///
    /// Returns the number of keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups answered from the cache.
    pub hits: u64,
    /// Number of lookups that fell through to the repository.
    pub misses: u64,
    /// Number of backend or codec failures absorbed.
    pub errors: u64,
    /// Number of successful writes.
    pub stores: u64,
    /// Number of invalidation passes that reached the backend.
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
