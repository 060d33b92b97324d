//! API Module
//!
//! HTTP handlers and routing for the catalog REST API. All routes live under `/api`.

pub mod cart;
pub mod customers;
pub mod handlers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod routes;

pub use handlers::{health_handler, stats_handler, AppState};
pub use routes::create_router;
