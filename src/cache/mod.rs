//! Cache Module
//!
//! Generic TTL-keyed cache abstraction with in-memory and Redis backends.

mod backend;
mod entry;
mod memory;
mod redis_backend;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use backend::{with_deadline, CacheBackend, CacheCommand, Pipeline, SharedCache};
pub use entry::{CacheEntry, CacheValue};
pub use memory::{glob_match, MemoryCache, DEFAULT_MAX_ENTRIES};
pub use redis_backend::{RedisCache, RedisCacheConfig};
pub use stats::{CacheCounters, CacheStats};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
