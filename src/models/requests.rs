//! Request DTOs for the catalog API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::models::{FieldError, ProductPatch};

/// Maximum accepted session identifier length
pub const MAX_SESSION_ID_LENGTH: usize = 128;

/// Request body for POST /api/cart/:session_id
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartRequest {
    pub sku: String,
    pub quantity: u32,
}

impl AddToCartRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<FieldError> {
        if self.sku.is_empty() {
            return Some(FieldError::new("sku", "sku is required", "required"));
        }
        if self.quantity < 1 {
            return Some(FieldError::new("quantity", "quantity must be at least 1", "min"));
        }
        None
    }
}

/// Request body for PUT /api/cart/:session_id/items/:sku
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemRequest {
    /// New quantity; 0 removes the item
    pub quantity: u32,
}

/// One entry of a bulk update (PUT /api/products)
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateItem {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(flatten)]
    pub patch: ProductPatch,
}

/// One entry of a bulk delete (DELETE /api/products)
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteItem {
    pub sku: String,
}

/// Query string for GET /api/products/search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

pub const MAX_PAGE_LIMIT: u32 = 100;

/// Query string for GET /api/customers/:id/orders
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_limit() -> u32 {
    10
}

impl PageQuery {
    pub fn validate(&self) -> Option<FieldError> {
        if self.page < 1 {
            return Some(FieldError::new("page", "page must be at least 1", "min"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Some(FieldError::new(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
                "invalid_limit",
            ));
        }
        None
    }
}

/// Validates an externally supplied cart session identifier.
///
/// Only `[A-Za-z0-9_-]` is accepted so the ID can be embedded in key patterns.
pub fn validate_session_id(session_id: &str) -> Option<FieldError> {
    let valid_chars = session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LENGTH || !valid_chars {
        return Some(FieldError::new(
            "sessionId",
            format!(
                "sessionId must be 1-{} characters of letters, digits, '-' or '_'",
                MAX_SESSION_ID_LENGTH
            ),
            "invalid_format",
        ));
    }
    None
}
