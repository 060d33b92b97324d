//! Cart Handlers
//!
//! Carts are keyed by a caller-supplied session identifier; there is no
//! cookie or auth handling here.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::handlers::{json_body, AppState};
use crate::error::{AppError, CartError, Result};
use crate::models::{
    validate_session_id, AddToCartRequest, ApiResponse, Cart, CartCleared, CartItemRemoved, FieldError,
    UpdateCartItemRequest,
};

fn check_session(session_id: &str) -> Result<()> {
    match validate_session_id(session_id) {
        Some(error) => Err(AppError::Validation {
            message: "Invalid session ID".to_string(),
            errors: vec![error],
        }),
        None => Ok(()),
    }
}

/// Handler for GET /api/cart/:session_id
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Cart>>> {
    check_session(&session_id)?;
    let cart = state.carts.get_cart(&session_id).await?;
    Ok(Json(ApiResponse::ok(cart)))
}

/// Handler for POST /api/cart/:session_id
///
/// The product is read through the catalog cache and the requested quantity
/// must not exceed its total stock. The check is per request: units already in
/// the cart are not counted, and stock is not reserved.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Cart>>)> {
    check_session(&session_id)?;
    let request = json_body(payload)?;
    if let Some(error) = request.validate() {
        return Err(AppError::Validation {
            message: "Invalid request data".to_string(),
            errors: vec![error],
        });
    }

    let (product, _) = state.products.get(&request.sku).await?;
    if request.quantity > product.stock.total {
        return Err(AppError::Validation {
            message: "Insufficient stock".to_string(),
            errors: vec![FieldError::new(
                "quantity",
                format!("only {} items available in stock", product.stock.total),
                "insufficient_stock",
            )],
        });
    }

    let cart = state.carts.add_item(&session_id, request.quantity, &product).await?;
    info!(session_id = %session_id, sku = %product.sku, quantity = request.quantity, "item added to cart");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(cart))))
}

/// Handler for PUT /api/cart/:session_id/items/:sku
///
/// A quantity of zero removes the line.
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path((session_id, sku)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>> {
    check_session(&session_id)?;
    let UpdateCartItemRequest { quantity } = json_body(payload)?;

    let cart = state.carts.update_item_quantity(&session_id, &sku, quantity).await?;
    Ok(Json(ApiResponse::ok(cart)))
}

/// Handler for DELETE /api/cart/:session_id/items/:sku
///
/// Idempotent: removing an absent line reports `removed: false`.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((session_id, sku)): Path<(String, String)>,
) -> Result<Json<ApiResponse<CartItemRemoved>>> {
    check_session(&session_id)?;

    let (cart, removed) = match state.carts.update_item_quantity(&session_id, &sku, 0).await {
        Ok(cart) => (cart, true),
        Err(CartError::ItemNotFound(_)) => (state.carts.get_cart(&session_id).await?, false),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ApiResponse::ok(CartItemRemoved { sku, removed, cart })))
}

/// Handler for DELETE /api/cart/:session_id
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<CartCleared>>> {
    check_session(&session_id)?;
    let removed_keys = state.carts.clear(&session_id).await?;

    Ok(Json(ApiResponse::ok(CartCleared {
        session_id,
        cleared: true,
        removed_keys,
    })))
}
