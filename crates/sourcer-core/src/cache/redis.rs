//! Redis cache backend.
//!
//! A [`redis::aio::ConnectionManager`] handles reconnection internally; TLS
//! is selected by the URL scheme (`rediss://`).

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::backend::CacheBackend;
use super::error::CacheError;

/// Shared Redis connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    url: String,
}

impl RedisCache {
    /// Connects to `url`. Fails fast when the URL is malformed; connection
    /// establishment itself is retried by the manager.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::ConnectionFailed {
            message: format!("invalid redis url: {e}"),
        })?;
        let manager =
            ConnectionManager::new(client)
                .await
                .map_err(|e| CacheError::ConnectionFailed {
                    message: e.to_string(),
                })?;
        Ok(Self {
            manager,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::OperationFailed {
                message: e.to_string(),
            })
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::OperationFailed {
                message: e.to_string(),
            })
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::OperationFailed {
                message: e.to_string(),
            })
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("url", &self.url).finish()
    }
}
