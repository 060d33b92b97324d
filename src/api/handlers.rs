//! API Handlers
//!
//! Shared application state plus the operational endpoints (health, cache stats).
//! Resource handlers live in their own modules.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::cache::{CacheStats, MemoryCache, SharedCache};
use crate::cart::CartStore;
use crate::catalog::{CatalogCache, ProductService};
use crate::commerce::{CustomerService, OrderService, ReviewService};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, BulkResponse, HealthResponse};
use crate::store::{self, SharedStore, Stores};

/// Application state shared across all handlers.
///
/// Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub carts: CartStore,
    pub customers: CustomerService,
    pub orders: OrderService,
    pub reviews: ReviewService,
    /// Product store, kept for health checks
    pub store: SharedStore,
    /// Bound on the health check's store ping
    pub deadline: Duration,
    /// Set when the process runs its own memory cache, so the sweeper can reach it
    pub memory_cache: Option<Arc<MemoryCache>>,
}

impl AppState {
    /// Wires the services over the given stores and cache backend.
    pub fn new(stores: Stores, cache: SharedCache, config: &Config) -> Self {
        let deadline = config.operation_timeout();
        let catalog = CatalogCache::new(cache.clone())
            .with_ttl(config.product_cache_ttl())
            .with_recent_limit(config.recent_products_limit)
            .with_operation_timeout(deadline);
        let products =
            ProductService::new(stores.products.clone(), catalog).with_operation_timeout(deadline);
        let carts = CartStore::new(cache)
            .with_ttl(config.cart_ttl())
            .with_operation_timeout(deadline);
        let customers = CustomerService::new(stores.customers.clone(), stores.orders.clone())
            .with_operation_timeout(deadline);
        let orders = OrderService::new(stores.orders.clone(), stores.customers.clone(), products.clone())
            .with_operation_timeout(deadline);
        let reviews = ReviewService::new(
            stores.reviews,
            stores.customers,
            stores.orders,
            products.clone(),
        )
        .with_operation_timeout(deadline);

        Self {
            products,
            carts,
            customers,
            orders,
            reviews,
            store: stores.products,
            deadline,
            memory_cache: None,
        }
    }

    /// Creates a self-contained state: in-memory stores and in-process cache.
    pub fn in_memory(config: &Config) -> Self {
        let memory = Arc::new(MemoryCache::new(config.max_entries));
        let mut state = Self::new(Stores::in_memory(), memory.clone(), config);
        state.memory_cache = Some(memory);
        state
    }
}

// == Extractor rejections ==
/// Turns a JSON body rejection into the API's validation envelope.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        AppError::validation("body", rejection.body_text(), "json_parse_error")
    })
}

pub(crate) fn query_params<T>(
    query: std::result::Result<axum::extract::Query<T>, QueryRejection>,
) -> Result<T> {
    query
        .map(|axum::extract::Query(params)| params)
        .map_err(|rejection| AppError::validation("query", rejection.body_text(), "invalid_query"))
}

/// Maps a malformed path segment, such as a non-UUID customer ID, to a validation error.
pub(crate) fn path_param<T>(path: std::result::Result<Path<T>, PathRejection>, field: &str) -> Result<T> {
    path.map(|Path(value)| value)
        .map_err(|rejection| AppError::validation(field, rejection.body_text(), "invalid_format"))
}

/// 200 when every item succeeded, 207 on partial success, 400 when nothing did.
pub(crate) fn bulk_status<T>(result: &BulkResponse<T>, success: StatusCode) -> StatusCode {
    if result.success_count == 0 {
        StatusCode::BAD_REQUEST
    } else if !result.errors.is_empty() {
        StatusCode::MULTI_STATUS
    } else {
        success
    }
}

/// Handler for GET /api/health
///
/// An unreachable store fails the check; an unreachable cache only degrades it.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<ApiResponse<HealthResponse>>> {
    if let Err(e) = store::with_deadline(state.deadline, state.store.ping()).await {
        error!(error = %e, "health check: store unreachable");
        return Err(AppError::Internal("Database unavailable".to_string()));
    }

    let cache_connected = state.products.catalog().is_available().await;
    Ok(Json(ApiResponse::ok(HealthResponse::new(cache_connected))))
}

/// Handler for GET /api/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<ApiResponse<CacheStats>> {
    Json(ApiResponse::ok(state.products.catalog().stats().await))
}
