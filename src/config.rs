//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Redis URL; unset selects the in-process memory cache
    pub redis_url: Option<String>,
    pub redis_key_prefix: Option<String>,
    /// PostgreSQL URL; unset selects the in-memory product store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Lifetime of cached products and catalog lists, in seconds
    pub product_cache_ttl: u64,
    /// Sliding cart lifetime, in seconds
    pub cart_ttl: u64,
    pub recent_products_limit: usize,
    /// Deadline for each cache or store call, in seconds
    pub operation_timeout: u64,
    /// Capacity of the memory cache
    pub max_entries: usize,
    /// Memory cache sweep interval, in seconds
    pub cleanup_interval: u64,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT` - HTTP server port (default: 8000)
    /// - `REDIS_URL` - Redis connection URL (default: unset, memory cache)
    /// - `REDIS_KEY_PREFIX` - Namespace for Redis keys (default: none)
    /// - `DATABASE_URL` - PostgreSQL URL (default: unset, in-memory store)
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
    /// - `PRODUCT_CACHE_TTL` - Product cache TTL in seconds (default: 86400)
    /// - `CART_TTL` - Cart TTL in seconds (default: 3600)
    /// - `RECENT_PRODUCTS_LIMIT` - Recent list length (default: 100)
    /// - `OPERATION_TIMEOUT` - Per-call deadline in seconds (default: 10)
    /// - `MAX_ENTRIES` - Memory cache capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - Memory cache sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("PORT", defaults.server_port),
            redis_url: optional("REDIS_URL"),
            redis_key_prefix: optional("REDIS_KEY_PREFIX"),
            database_url: optional("DATABASE_URL"),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections),
            product_cache_ttl: parsed("PRODUCT_CACHE_TTL", defaults.product_cache_ttl),
            cart_ttl: parsed("CART_TTL", defaults.cart_ttl),
            recent_products_limit: parsed("RECENT_PRODUCTS_LIMIT", defaults.recent_products_limit),
            operation_timeout: parsed("OPERATION_TIMEOUT", defaults.operation_timeout),
            max_entries: parsed("MAX_ENTRIES", defaults.max_entries),
            cleanup_interval: parsed("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    pub fn product_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.product_cache_ttl)
    }

    pub fn cart_ttl(&self) -> Duration {
        Duration::from_secs(self.cart_ttl)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            redis_url: None,
            redis_key_prefix: None,
            database_url: None,
            database_max_connections: 10,
            product_cache_ttl: 86_400,
            cart_ttl: 3_600,
            recent_products_limit: 100,
            operation_timeout: 10,
            max_entries: 10_000,
            cleanup_interval: 1,
        }
    }
}
