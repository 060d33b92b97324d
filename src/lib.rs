//! Catalog API - an e-commerce catalog and cart service
//!
//! Products are persisted in a document store and served through a
//! read-through cache; session carts live entirely in the cache. Customers,
//! orders and reviews are persisted alongside the products.

pub mod api;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod commerce;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use tasks::spawn_cleanup_task;
