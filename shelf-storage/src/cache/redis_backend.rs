//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use shelf_core::CacheError;

use super::traits::CacheBackend;

const SCAN_BATCH: usize = 200;

/// Cache backend on top of a multiplexed Redis connection.
///
/// `ConnectionManager` reconnects on its own; each call clones the handle.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn_manager: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` if the URL is invalid or the initial
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| CacheError::Transport {
            reason: format!("Failed to create Redis client: {e}"),
        })?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Transport {
                reason: format!("Failed to create Redis connection manager: {e}"),
            })?;

        Ok(Self { conn_manager })
    }
}

fn transport(e: redis::RedisError) -> CacheError {
    CacheError::Transport {
        reason: e.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(transport)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_seconds).await.map_err(transport)?;
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn_manager.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(transport)?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.map_err(transport)?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(pattern, removed, "Deleted Redis keys by pattern");
        Ok(removed)
    }
}
