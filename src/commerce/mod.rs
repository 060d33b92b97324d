//! Commerce Module
//!
//! Customers, orders and reviews. These go straight to their stores; only
//! product documents are cached.

mod customers;
mod orders;
pub mod password;
mod reviews;

pub use customers::CustomerService;
pub use orders::OrderService;
pub use reviews::ReviewService;
