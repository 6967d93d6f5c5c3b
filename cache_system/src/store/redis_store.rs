//! Redis-backed store

use super::CacheStore;
use crate::errors::CacheError;
use async_trait::async_trait;
use config::StoreConfig;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::fmt::Debug;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Store adapter over a single Redis database
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<Client>,
    config: Arc<StoreConfig>,
    connection_pool: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection_pool.try_read() {
                Ok(pool) => {
                    if pool.is_some() {
                        "connected"
                    } else {
                        "no_connection"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("RedisStore")
            .field("redis_url", &self.config.redis_url)
            .field("connected", &connection_status)
            .finish()
    }
}

impl RedisStore {
    /// Create a new store; the connection is opened on first use
    pub fn new(config: StoreConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut pool = self.connection_pool.write().await;

        if pool.is_none() {
            let timeout = Duration::from_millis(self.config.connection_timeout_ms);
            let connection =
                tokio::time::timeout(timeout, self.client.get_multiplexed_async_connection())
                    .await
                    .map_err(|_| CacheError::Timeout)??;
            *pool = Some(connection);
        }

        Ok(pool
            .as_ref()
            .ok_or_else(|| CacheError::Connection("Failed to get connection from pool".into()))?
            .clone())
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.get_connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        let deleted: u64 = conn.del(key).await?;
        Ok(deleted)
    }

    async fn list_length(&self, list: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        let len: u64 = conn.llen(list).await?;
        Ok(len)
    }

    async fn list_push_front(&self, list: &str, value: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        let len: u64 = conn.lpush(list, value).await?;
        Ok(len)
    }

    async fn list_remove(&self, list: &str, value: &str, count: usize) -> Result<u64, CacheError> {
        let count = isize::try_from(count)
            .map_err(|_| CacheError::Store(format!("LREM count {} out of range", count)))?;
        let mut conn = self.get_connection().await?;
        let removed: u64 = conn.lrem(list, count, value).await?;
        Ok(removed)
    }

    async fn list_pop_back(&self, list: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        let popped: Option<String> = conn.rpop(list, None::<NonZeroUsize>).await?;
        Ok(popped)
    }

    async fn list_range(
        &self,
        list: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        let values: Vec<String> = conn.lrange(list, start, stop).await?;
        Ok(values)
    }

    async fn flush_namespace(&self) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
