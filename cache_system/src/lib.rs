//! Cache system for memoizing computations in Redis
//!
//! This crate turns any deterministic computation into a cached one:
//! calls are fingerprinted, results are stored as MessagePack in a key-value
//! store, and a recency queue kept in the same store bounds the number of
//! live entries with least-recently-used eviction.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod args;
pub mod codec;
pub mod errors;
pub mod fingerprint;
pub mod manager;
pub mod prelude;
pub mod recency;
pub mod store;
pub mod wrapper;

// Re-export centralized config
pub use config::{CacheConfig, StoreConfig};

pub use args::{ArgValue, Args, CallArgs, ToArgValue};
pub use errors::{CacheError, CallError};
pub use fingerprint::Fingerprinter;
pub use manager::CacheManager;
pub use recency::{RECENCY_QUEUE_KEY, RecencyQueue};
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use wrapper::Cached;
