//! Customer Handlers
//!
//! Profiles, address books and per-customer order and review listings.
//! Customers are addressed by UUID; addresses by their position in the book.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::handlers::{json_body, path_param, query_params, AppState};
use crate::error::Result;
use crate::models::{
    Address, ApiResponse, Customer, CustomerDeleted, CustomerOrders, CustomerPatch, NewCustomer,
    PageQuery, Review,
};

type CustomerResponse = Json<ApiResponse<Customer>>;

/// Handler for GET /api/customers
pub async fn list_customers(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Customer>>>> {
    let customers = state.customers.list().await?;
    Ok(Json(ApiResponse::ok(customers)))
}

/// Handler for POST /api/customers
pub async fn create_customer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, CustomerResponse)> {
    let request = json_body(payload)?;
    let customer = state.customers.register(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(customer))))
}

/// Handler for GET /api/customers/:id
pub async fn get_customer(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<CustomerResponse> {
    let id = path_param(path, "id")?;
    Ok(Json(ApiResponse::ok(state.customers.get(id).await?)))
}

/// Handler for PUT /api/customers/:id
///
/// The email address cannot be changed; unknown and immutable keys are ignored.
pub async fn update_customer(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<CustomerPatch>, JsonRejection>,
) -> Result<CustomerResponse> {
    let id = path_param(path, "id")?;
    let patch = json_body(payload)?;
    Ok(Json(ApiResponse::ok(state.customers.update(id, patch).await?)))
}

/// Handler for DELETE /api/customers/:id
pub async fn delete_customer(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<CustomerDeleted>>> {
    let id = path_param(path, "id")?;
    let deleted = state.customers.delete(id).await?;
    Ok(Json(ApiResponse::ok(CustomerDeleted { id: deleted.id })))
}

/// Handler for POST /api/customers/:id/addresses
pub async fn add_address(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<Address>, JsonRejection>,
) -> Result<(StatusCode, CustomerResponse)> {
    let id = path_param(path, "id")?;
    let address = json_body(payload)?;
    let customer = state.customers.add_address(id, address).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(customer))))
}

/// Handler for PUT /api/customers/:id/addresses/:index
pub async fn update_address(
    State(state): State<AppState>,
    path: std::result::Result<Path<(Uuid, usize)>, PathRejection>,
    payload: std::result::Result<Json<Address>, JsonRejection>,
) -> Result<CustomerResponse> {
    let (id, index) = path_param(path, "path")?;
    let address = json_body(payload)?;
    Ok(Json(ApiResponse::ok(
        state.customers.update_address(id, index, address).await?,
    )))
}

/// Handler for DELETE /api/customers/:id/addresses/:index
pub async fn delete_address(
    State(state): State<AppState>,
    path: std::result::Result<Path<(Uuid, usize)>, PathRejection>,
) -> Result<CustomerResponse> {
    let (id, index) = path_param(path, "path")?;
    Ok(Json(ApiResponse::ok(state.customers.remove_address(id, index).await?)))
}

/// Handler for GET /api/customers/:id/orders?page=&limit=
pub async fn customer_orders(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<CustomerOrders>>> {
    let id = path_param(path, "id")?;
    let page = query_params(query)?;
    Ok(Json(ApiResponse::ok(state.customers.orders(id, page).await?)))
}

/// Handler for GET /api/customers/:id/reviews
pub async fn customer_reviews(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<Review>>>> {
    let id = path_param(path, "id")?;
    Ok(Json(ApiResponse::ok(state.reviews.list_for_customer(id).await?)))
}
