//! Domain models and API DTOs
//!
//! Product, cart, customer, order and review documents plus the
//! request/response bodies used by the HTTP layer.

pub mod cart;
pub mod customer;
pub mod order;
pub mod product;
pub mod requests;
pub mod responses;
pub mod review;

// Re-export commonly used types
pub use cart::{Cart, CartItem};
pub use customer::{AccountStatus, Address, Customer, CustomerPatch, NewCustomer, Preferences};
pub use order::{
    BulkOrderDeleteItem, BulkOrderUpdateItem, NewOrder, NewOrderItem, Order, OrderPatch,
    OrderStatus,
};
pub use product::{validate_sku, NewProduct, Product, ProductPatch, ProductStatus, Ratings, Stock};
pub use requests::{
    validate_session_id, AddToCartRequest, BulkDeleteItem, BulkUpdateItem, PageQuery, SearchQuery,
    UpdateCartItemRequest,
};
pub use review::{NewReview, Review, ReviewPatch};
pub use responses::{
    ApiResponse, BulkResponse, CartCleared, CartItemRemoved, CustomerDeleted, CustomerOrders,
    FieldError, HealthResponse, OrderDeleted, OrderSummary, Pagination, ProductDeleted,
    ProductsCreated, ReviewDeleted,
};
