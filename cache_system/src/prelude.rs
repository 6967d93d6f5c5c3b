//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::args::{ArgValue, Args, CallArgs, ToArgValue};
pub use crate::errors::{CacheError, CallError};
pub use crate::manager::CacheManager;
pub use crate::store::{CacheStore, MemoryStore, RedisStore};
pub use crate::wrapper::Cached;

// Re-export centralized config
pub use config::{CacheConfig, StoreConfig};

// Common external dependencies
pub use async_trait::async_trait;
pub use redis;
pub use serde::{Deserialize, Serialize};
pub use rmp_serde;
pub use tokio;
