//! Catalog Module
//!
//! Read-through product cache and the product service built on top of it.

mod cache;
pub mod keys;
mod service;

pub use cache::{
    CacheWrite, CatalogCache, DEFAULT_OPERATION_TIMEOUT, DEFAULT_PRODUCT_TTL, DEFAULT_RECENT_LIMIT,
};
pub use service::{CacheStatus, ProductService, MAX_SEARCH_LIMIT};
