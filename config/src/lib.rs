//! # Configuration Management for MemoHaus
//!
//! This crate provides centralized configuration structures for all MemoHaus components:
//! the Redis store connection and the memoizing LRU cache layered on top of it.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, StoreConfig};
//!
//! // Store configuration
//! let store_config = StoreConfig::new("redis://localhost:6379".to_string(), 3000);
//!
//! // Cache configuration
//! let cache_config = CacheConfig::new(512, "fibonacci".to_string(), true);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [store]
//! redis_url = "redis://localhost:6379"
//! connection_timeout_ms = 3000
//!
//! [cache]
//! max_size = 1048576
//! key_prefix = "memohaus"
//! clear_on_start = false
//! degrade_on_store_error = false
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from memohaus.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./memohaus.toml";
const CONFIG_PATH_ENV: &str = "MEMOHAUS_CONFIG";

/// Default capacity of the recency queue (2^20 entries)
pub const DEFAULT_MAX_SIZE: usize = 1 << 20;
pub const DEFAULT_KEY_PREFIX: &str = "memohaus";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote store (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub redis_url: String,
    pub connection_timeout_ms: u64,
}

/// Memoizing cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the recency queue
    pub max_size: usize,
    /// Namespace prepended to every entry key
    pub key_prefix: String,
    /// Flush the whole store database at construction instead of trimming the queue
    #[serde(default)]
    pub clear_on_start: bool,
    /// Fall back to direct computation when the store is unreachable
    #[serde(default)]
    pub degrade_on_store_error: bool,
}

impl AppConfig {
    /// Load configuration from the TOML file named in .env / environment, or defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = {
            // A missing .env file is fine, the variable may come from the real environment
            dotenvy::dotenv().ok();

            if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
                Self::from_file(&config_path)
            } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
                Self::from_file(DEFAULT_CONFIG_PATH)
            } else {
                Err(ConfigError::Invalid(format!(
                    "Config path must be specified in .env file as {} or in {} file",
                    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
                )))
            }
        }?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.cache.validate()
    }
}

impl StoreConfig {
    /// Create a new store configuration
    pub fn new(redis_url: String, connection_timeout_ms: u64) -> Self {
        Self {
            redis_url,
            connection_timeout_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Redis URL cannot be empty".to_string(),
            ));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Store connection_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            connection_timeout_ms: 3000,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(max_size: usize, key_prefix: String, clear_on_start: bool) -> Self {
        Self {
            max_size,
            key_prefix,
            clear_on_start,
            degrade_on_store_error: false,
        }
    }

    /// Compute directly instead of failing when the store cannot be reached
    pub fn with_graceful_degradation(mut self) -> Self {
        self.degrade_on_store_error = true;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Invalid(
                "Cache max_size must be greater than 0".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "Cache key_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_KEY_PREFIX.to_string(), false)
    }
}
