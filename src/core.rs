//! Core MemoHaus functionality
//!
//! This module contains the main MemoHaus struct, which wires configuration,
//! the Redis store adapter and the cache manager together.

use cache_system::{Cached, CacheManager, RedisStore};
use config::{AppConfig, CacheConfig, StoreConfig};
use std::sync::Arc;

use crate::errors::MemoHausError;

/// Main MemoHaus coordinator owning the Redis connection and the cache built on it
#[derive(Debug, Clone)]
pub struct MemoHaus {
    store: Arc<RedisStore>,
    cache: CacheManager<RedisStore>,
}

impl MemoHaus {
    /// Connect using configuration from `MEMOHAUS_CONFIG` or `./memohaus.toml`
    pub async fn load() -> Result<Self, MemoHausError> {
        let config = AppConfig::load()?;
        Self::from_config(config).await
    }

    /// Connect using an already loaded application configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, MemoHausError> {
        Self::new(config.store, config.cache).await
    }

    /// Create new MemoHaus with a Redis store and cache configuration
    pub async fn new(
        store_config: StoreConfig,
        cache_config: CacheConfig,
    ) -> Result<Self, MemoHausError> {
        let store = Arc::new(RedisStore::new(store_config)?);
        let cache = CacheManager::new(Arc::clone(&store), cache_config).await?;

        tracing::info!(
            max_size = cache.config().max_size,
            prefix = %cache.config().key_prefix,
            "memohaus cache ready"
        );

        Ok(Self { store, cache })
    }

    /// Get the cache manager
    pub fn cache(&self) -> &CacheManager<RedisStore> {
        &self.cache
    }

    /// Wrap a function, identified by its Rust type name
    pub fn wrap<F: 'static>(&self, computation: F) -> Cached<RedisStore, F> {
        self.cache.wrap(computation)
    }

    /// Wrap a computation under an explicit identity
    pub fn wrap_named<F>(&self, identity: impl Into<String>, computation: F) -> Cached<RedisStore, F> {
        self.cache.wrap_named(identity, computation)
    }

    /// Check Redis connection health
    pub async fn health_check(&self) -> Result<(), MemoHausError> {
        self.store.ping().await?;
        Ok(())
    }
}
