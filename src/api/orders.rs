//! Order Handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::handlers::{bulk_status, json_body, AppState};
use crate::error::Result;
use crate::models::{
    ApiResponse, BulkOrderDeleteItem, BulkOrderUpdateItem, NewOrder, Order, OrderDeleted,
    OrderPatch,
};

/// Handler for GET /api/orders
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Order>>>> {
    Ok(Json(ApiResponse::ok(state.orders.list().await?)))
}

/// Handler for POST /api/orders
///
/// Places each order independently: 201 when all succeed, 207 on partial success.
pub async fn create_orders(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<NewOrder>>, JsonRejection>,
) -> Result<Response> {
    let requests = json_body(payload)?;
    let result = state.orders.create_many(requests).await?;
    Ok((bulk_status(&result, StatusCode::CREATED), Json(ApiResponse::ok(result))).into_response())
}

/// Handler for PUT /api/orders
pub async fn bulk_update_orders(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<BulkOrderUpdateItem>>, JsonRejection>,
) -> Result<Response> {
    let items = json_body(payload)?;
    let result = state.orders.bulk_update(items).await?;
    Ok((bulk_status(&result, StatusCode::OK), Json(ApiResponse::ok(result))).into_response())
}

/// Handler for DELETE /api/orders
pub async fn bulk_delete_orders(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<BulkOrderDeleteItem>>, JsonRejection>,
) -> Result<Response> {
    let items = json_body(payload)?;
    let result = state.orders.bulk_delete(items).await?;
    Ok((bulk_status(&result, StatusCode::OK), Json(ApiResponse::ok(result))).into_response())
}

/// Handler for GET /api/orders/:order_number
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<Order>>> {
    Ok(Json(ApiResponse::ok(state.orders.get(&order_number).await?)))
}

/// Handler for PUT /api/orders/:order_number
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    payload: std::result::Result<Json<OrderPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<Order>>> {
    let patch = json_body(payload)?;
    Ok(Json(ApiResponse::ok(state.orders.update(&order_number, patch).await?)))
}

/// Handler for DELETE /api/orders/:order_number
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderDeleted>>> {
    let order = state.orders.delete(&order_number).await?;
    Ok(Json(ApiResponse::ok(OrderDeleted {
        deleted_order_number: order.order_number.clone(),
        order,
    })))
}
