//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! while fingerprinting calls, talking to the store, and
//! encoding cached results.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Arguments are unhashable: {argument} is a {kind}")]
    ArgumentsUnhashable { argument: String, kind: &'static str },

    #[error("Redis connection error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Connection pool error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] rmp_serde::encode::Error),

    #[error("Value does not survive encoding: {0}")]
    LossyEncoding(String),

    #[error("Corrupt cache entry {key}: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: rmp_serde::decode::Error,
    },

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CacheError {
    /// Whether this error came from talking to the backing store
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            CacheError::ConnectionError(_)
                | CacheError::Connection(_)
                | CacheError::Timeout
                | CacheError::Store(_)
        )
    }
}

/// Failure of a call made through the cache
///
/// The computation's own error is carried unchanged in `Computation`;
/// everything the cache layer itself can raise arrives as `Cache`.
#[derive(Error, Debug)]
pub enum CallError<E> {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Computation failed: {0}")]
    Computation(E),
}

impl<E> CallError<E> {
    /// The computation's error, if that is what failed
    pub fn computation(self) -> Option<E> {
        match self {
            CallError::Computation(err) => Some(err),
            CallError::Cache(_) => None,
        }
    }

    pub fn is_unhashable(&self) -> bool {
        matches!(self, CallError::Cache(CacheError::ArgumentsUnhashable { .. }))
    }
}
