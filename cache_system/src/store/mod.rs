//! Remote store adapter contract
//!
//! The cache only ever talks to its backing store through [`CacheStore`]:
//! plain get/set/delete on entries plus a handful of list primitives for the
//! recency queue. No operation is assumed to be atomic with any other.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::errors::CacheError;
use async_trait::async_trait;

/// Key-value and list operations the cache requires of its backing store
///
/// List operations follow Redis semantics: the front is index 0, a list that
/// becomes empty ceases to exist, and `list_remove` with `count == 0` removes
/// every occurrence.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Returns the number of keys removed
    async fn delete(&self, key: &str) -> Result<u64, CacheError>;

    async fn list_length(&self, list: &str) -> Result<u64, CacheError>;

    /// Returns the list length after the push
    async fn list_push_front(&self, list: &str, value: &str) -> Result<u64, CacheError>;

    /// Removes up to `count` occurrences of `value` scanning from the front
    async fn list_remove(&self, list: &str, value: &str, count: usize) -> Result<u64, CacheError>;

    async fn list_pop_back(&self, list: &str) -> Result<Option<String>, CacheError>;

    /// Elements between `start` and `stop` inclusive; negative indexes count from the back
    async fn list_range(&self, list: &str, start: isize, stop: isize)
        -> Result<Vec<String>, CacheError>;

    /// Drop every key this store can see
    async fn flush_namespace(&self) -> Result<(), CacheError>;
}
