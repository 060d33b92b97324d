//! Response DTOs for the catalog API
//!
//! Every endpoint answers with the same `ApiResponse` envelope.

use serde::Serialize;

use uuid::Uuid;

use crate::models::{Cart, Order, Product, Review};

/// Per-field error detail attached to error and partial-success responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Offending field, e.g. `sku` or `[2].sku` for bulk items
    pub field: String,
    /// Human readable description
    pub message: String,
    /// Machine readable code, e.g. `not_found`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
}

impl FieldError {
    /// Creates a new FieldError
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Response envelope shared by all endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T> ApiResponse<T> {
    /// Wraps a successful payload
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: Vec::new(),
        }
    }

    /// Builds an error envelope
    pub fn error(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors,
        }
    }
}

/// Result of a bulk product operation with partial-success semantics
#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse<T> {
    pub items: Vec<T>,
    pub success_count: usize,
    pub total_requested: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
}

impl<T> BulkResponse<T> {
    pub fn new(items: Vec<T>, errors: Vec<FieldError>, total_requested: usize) -> Self {
        let error_count = (!errors.is_empty()).then_some(errors.len());
        Self {
            success_count: items.len(),
            items,
            total_requested,
            errors,
            error_count,
        }
    }
}

/// Response body for POST /api/products
#[derive(Debug, Clone, Serialize)]
pub struct ProductsCreated {
    pub products: Vec<Product>,
    pub count: usize,
}

/// Response body for DELETE /api/products/:sku
#[derive(Debug, Clone, Serialize)]
pub struct ProductDeleted {
    pub deleted_sku: String,
    pub message: String,
}

/// Response body for DELETE /api/cart/:session_id/items/:sku
#[derive(Debug, Clone, Serialize)]
pub struct CartItemRemoved {
    pub sku: String,
    pub removed: bool,
    pub cart: Cart,
}

/// Response body for DELETE /api/cart/:session_id
#[derive(Debug, Clone, Serialize)]
pub struct CartCleared {
    pub session_id: String,
    pub cleared: bool,
    pub removed_keys: usize,
}

/// Response body for DELETE /api/customers/:id
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDeleted {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub total_orders: usize,
    /// Sum of grand totals over every order of the customer, not just this page
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub total_items: usize,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_items: usize) -> Self {
        let limit_items = limit.max(1) as usize;
        let total_pages = total_items.div_ceil(limit_items);
        Self {
            page,
            limit,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_items,
        }
    }

    /// Index range of this page within `total_items`.
    pub fn range(&self) -> std::ops::Range<usize> {
        let limit = self.limit as usize;
        let start = (self.page.saturating_sub(1) as usize)
            .saturating_mul(limit)
            .min(self.total_items);
        let end = start.saturating_add(limit).min(self.total_items);
        start..end
    }
}

/// Response body for GET /api/customers/:id/orders
#[derive(Debug, Clone, Serialize)]
pub struct CustomerOrders {
    pub orders: Vec<Order>,
    pub summary: OrderSummary,
    pub pagination: Pagination,
}

/// Response body for DELETE /api/orders/:order_number
#[derive(Debug, Clone, Serialize)]
pub struct OrderDeleted {
    pub deleted_order_number: String,
    pub order: Order,
}

/// Response body for DELETE /api/products/:sku/reviews/:review_id
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDeleted {
    pub deleted_review_id: Uuid,
    pub review: Review,
}

/// Response body for the health endpoint (GET /api/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub database: String,
    pub cache: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse; a reachable store with an unreachable cache is degraded.
    pub fn new(cache_connected: bool) -> Self {
        Self {
            status: if cache_connected { "healthy" } else { "degraded" }.to_string(),
            database: "connected".to_string(),
            cache: if cache_connected { "connected" } else { "unavailable" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
