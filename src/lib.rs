//! # MemoHaus
//!
//! Memoize any deterministic computation in Redis. Calls are fingerprinted
//! from the computation's identity and its arguments, results are stored as
//! MessagePack, and a recency queue living in Redis itself keeps the number of
//! entries bounded with least-recently-used eviction. Because the queue is in
//! the store, it survives restarts and is shared by every process using it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memohaus::prelude::*;
//! use std::convert::Infallible;
//!
//! async fn slow_square((n,): (u64,)) -> Result<u64, Infallible> {
//!     tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//!     Ok(n * n)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let memohaus = MemoHaus::new(
//!         StoreConfig::new("redis://localhost:6379".to_string(), 3000),
//!         CacheConfig::new(512, "quickstart".to_string(), false),
//!     )
//!     .await?;
//!
//!     let square = memohaus.wrap(slow_square);
//!
//!     // First call computes, second is served from Redis
//!     println!("{}", square.call((12,)).await?);
//!     println!("{}", square.call((12,)).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::MemoHaus;
pub use errors::MemoHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, StoreConfig};

// Re-export internal crates
pub use cache_system;

// Re-export external dependencies used in public API
pub use async_trait;
pub use redis;
