//! Recency queue kept in the store
//!
//! An ordered list of fingerprints, most recently used at the front. The
//! ordering lives in the store's list type so it survives restarts and is
//! shared by every client of the same store; there is no in-process copy.

use crate::errors::CacheError;
use crate::store::CacheStore;
use std::sync::Arc;

/// Store key of the recency queue
pub const RECENCY_QUEUE_KEY: &str = "CacheList";

pub struct RecencyQueue<S: CacheStore> {
    store: Arc<S>,
    max_size: usize,
}

impl<S: CacheStore> Clone for RecencyQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_size: self.max_size,
        }
    }
}

impl<S: CacheStore> RecencyQueue<S> {
    pub fn new(store: Arc<S>, max_size: usize) -> Self {
        Self { store, max_size }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Move an existing key to the front
    ///
    /// Returns false when the key was not queued before, in which case the
    /// queue grew by one and the caller must settle capacity.
    pub async fn promote(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.store.list_remove(RECENCY_QUEUE_KEY, key, 1).await?;
        self.store.list_push_front(RECENCY_QUEUE_KEY, key).await?;
        crate::trace_log!("promoted {} to front of recency queue", key);
        Ok(removed > 0)
    }

    /// Push a freshly stored key to the front
    ///
    /// A stale occurrence left behind by an entry lost out-of-band is dropped
    /// first so the queue holds each key at most once.
    pub async fn insert(&self, key: &str) -> Result<(), CacheError> {
        self.store.list_remove(RECENCY_QUEUE_KEY, key, 0).await?;
        self.store.list_push_front(RECENCY_QUEUE_KEY, key).await?;
        Ok(())
    }

    /// Drop `key` from the queue without touching its entry
    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.store.list_remove(RECENCY_QUEUE_KEY, key, 0).await?;
        Ok(removed > 0)
    }

    /// Pop least recently used keys, deleting their entries, until within capacity
    ///
    /// Returns the evicted keys, oldest first.
    pub async fn evict_if_over_capacity(&self) -> Result<Vec<String>, CacheError> {
        let mut evicted = Vec::new();

        while self.len().await? > self.max_size {
            // Another client may have drained the tail between the two calls
            let Some(key) = self.store.list_pop_back(RECENCY_QUEUE_KEY).await? else {
                break;
            };
            self.store.delete(&key).await?;
            crate::debug_log!("evicted {} from cache", key);
            evicted.push(key);
        }

        Ok(evicted)
    }

    /// Pop every key, deleting its entry; returns how many were drained
    pub async fn drain(&self) -> Result<usize, CacheError> {
        let mut drained = 0;
        while let Some(key) = self.store.list_pop_back(RECENCY_QUEUE_KEY).await? {
            self.store.delete(&key).await?;
            drained += 1;
        }
        Ok(drained)
    }

    pub async fn len(&self) -> Result<usize, CacheError> {
        let len = self.store.list_length(RECENCY_QUEUE_KEY).await?;
        Ok(len as usize)
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Current queue contents, front (most recent) first
    pub async fn snapshot(&self) -> Result<Vec<String>, CacheError> {
        self.store.list_range(RECENCY_QUEUE_KEY, 0, -1).await
    }
}
