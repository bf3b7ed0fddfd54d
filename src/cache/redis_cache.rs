//! Redis-backed shared cache
//!
//! Uses `SETEX` so expiration is enforced by Redis itself; keys are the
//! fingerprint hex strings, values the JSON response bodies.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{Cache, CacheError};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect and verify the server answers `PING` within `timeout`.
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let mut conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(timeout))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let pong = tokio::time::timeout(
            timeout,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Timeout(timeout))?
        .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        tracing::debug!("Redis answered {}", pong);
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
