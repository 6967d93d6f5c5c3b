//! Convenience re-exports for common MemoHaus usage
//!
//! This prelude module re-exports the most commonly used items from the MemoHaus ecosystem,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use memohaus::prelude::*;
//!
//! // Now you have access to all the common MemoHaus types and traits
//! ```

// Core MemoHaus components
pub use crate::core::MemoHaus;
pub use crate::errors::MemoHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, StoreConfig};

// Re-export cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
