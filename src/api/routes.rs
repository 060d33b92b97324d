//! API Routes
//!
//! Configures the Axum router with the catalog, cart, customer, order and review endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::cart::{add_to_cart, clear_cart, get_cart, remove_cart_item, update_cart_item};
use super::customers::{
    add_address, create_customer, customer_orders, customer_reviews, delete_address,
    delete_customer, get_customer, list_customers, update_address, update_customer,
};
use super::handlers::{health_handler, stats_handler, AppState};
use super::products::{
    bulk_delete_products, bulk_update_products, create_products, delete_product, get_product,
    list_categories, list_products, search_products, update_product,
};
use super::orders::{
    bulk_delete_orders, bulk_update_orders, create_orders, delete_order, get_order, list_orders,
    update_order,
};
use super::reviews::{create_review, delete_review, list_reviews, update_review};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/health` - Store and cache reachability
/// - `GET|POST|PUT|DELETE /api/products` - List, bulk create, bulk update, bulk delete
/// - `GET /api/products/categories` - Distinct categories
/// - `GET /api/products/search?q=&limit=` - Text search
/// - `GET|PUT|DELETE /api/products/:sku` - Single product (read-through cached)
/// - `GET|POST /api/products/:sku/reviews` - Product reviews
/// - `PUT|DELETE /api/products/:sku/reviews/:review_id` - Edit or remove a review
/// - `GET|POST|DELETE /api/cart/:session_id` - Cart view, add item, clear
/// - `PUT|DELETE /api/cart/:session_id/items/:sku` - Change or remove a line
/// - `GET|POST /api/customers` - List, register
/// - `GET|PUT|DELETE /api/customers/:id` - Single customer
/// - `POST /api/customers/:id/addresses` - Add an address
/// - `PUT|DELETE /api/customers/:id/addresses/:index` - Change or remove an address
/// - `GET /api/customers/:id/orders?page=&limit=` - Paginated order history
/// - `GET /api/customers/:id/reviews` - Reviews written by the customer
/// - `GET|POST|PUT|DELETE /api/orders` - List, bulk place, bulk update, bulk delete
/// - `GET|PUT|DELETE /api/orders/:order_number` - Single order
/// - `GET /api/cache/stats` - Catalog cache counters
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Static segments take precedence over `:sku`, so categories and search stay reachable.
    let api = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/products",
            get(list_products)
                .post(create_products)
                .put(bulk_update_products)
                .delete(bulk_delete_products),
        )
        .route("/products/categories", get(list_categories))
        .route("/products/search", get(search_products))
        .route(
            "/products/:sku",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:sku/reviews", get(list_reviews).post(create_review))
        .route(
            "/products/:sku/reviews/:review_id",
            put(update_review).delete(delete_review),
        )
        .route(
            "/cart/:session_id",
            get(get_cart).post(add_to_cart).delete(clear_cart),
        )
        .route(
            "/cart/:session_id/items/:sku",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/:id/addresses", post(add_address))
        .route(
            "/customers/:id/addresses/:index",
            put(update_address).delete(delete_address),
        )
        .route("/customers/:id/orders", get(customer_orders))
        .route("/customers/:id/reviews", get(customer_reviews))
        .route(
            "/orders",
            get(list_orders)
                .post(create_orders)
                .put(bulk_update_orders)
                .delete(bulk_delete_orders),
        )
        .route(
            "/orders/:order_number",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/cache/stats", get(stats_handler));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
