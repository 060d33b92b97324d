//! Cart Module
//!
//! Session-scoped shopping carts stored as cache hashes with a sliding TTL.

pub mod codec;
mod store;


pub use store::{CartStore, DEFAULT_CART_TTL};
