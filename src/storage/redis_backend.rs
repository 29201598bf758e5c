//! Redis record backend.
//!
//! Each record is a plain string value under its full key, so records can be
//! inspected with `redis-cli GET hpc-gateway/job/<id>`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::RecordBackend;
use crate::error::StoreError;

/// Durable record backend on top of Redis.
pub struct RedisBackend {
    /// Redis connection manager (handles reconnection automatically).
    redis: ConnectionManager,
}

impl RedisBackend {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(Self { redis })
    }

    /// Creates a backend from an existing ConnectionManager.
    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RecordBackend for RedisBackend {
    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(key, blob).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key).await?;
        value.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
