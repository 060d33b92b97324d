//! Product Handlers
//!
//! Catalog endpoints. Single-product responses carry an `X-Cache` header naming
//! the path that served them.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::handlers::{bulk_status, json_body, query_params, AppState};
use crate::catalog::CacheStatus;
use crate::error::Result;
use crate::models::{
    ApiResponse, BulkDeleteItem, BulkUpdateItem, NewProduct, Product, ProductDeleted,
    ProductPatch, ProductsCreated, SearchQuery,
};

const X_CACHE: &str = "x-cache";

fn with_cache_status<T: Serialize>(status: StatusCode, cache: CacheStatus, data: T) -> Response {
    (status, [(X_CACHE, cache.as_str())], Json(ApiResponse::ok(data))).into_response()
}

/// Handler for GET /api/products
pub async fn list_products(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = state.products.list().await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Handler for POST /api/products
///
/// Accepts a JSON array of new products; any invalid entry rejects the batch.
pub async fn create_products(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<NewProduct>>, JsonRejection>,
) -> Result<Response> {
    let requests = json_body(payload)?;
    let (products, cache) = state.products.create_many(requests).await?;

    let body = ProductsCreated {
        count: products.len(),
        products,
    };
    Ok(with_cache_status(StatusCode::CREATED, cache, body))
}

/// Handler for PUT /api/products
pub async fn bulk_update_products(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<BulkUpdateItem>>, JsonRejection>,
) -> Result<Response> {
    let items = json_body(payload)?;
    let (result, cache) = state.products.bulk_update(items).await?;
    Ok(with_cache_status(bulk_status(&result, StatusCode::OK), cache, result))
}

/// Handler for DELETE /api/products
pub async fn bulk_delete_products(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<BulkDeleteItem>>, JsonRejection>,
) -> Result<Response> {
    let items = json_body(payload)?;
    let (result, cache) = state.products.bulk_delete(items).await?;
    Ok(with_cache_status(bulk_status(&result, StatusCode::OK), cache, result))
}

/// Handler for GET /api/products/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    let categories = state.products.categories().await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// Handler for GET /api/products/search?q=&limit=
pub async fn search_products(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let SearchQuery { q, limit } = query_params(query)?;
    let products = state.products.search(&q, limit).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Handler for GET /api/products/:sku
pub async fn get_product(State(state): State<AppState>, Path(sku): Path<String>) -> Result<Response> {
    let (product, cache) = state.products.get(&sku).await?;
    Ok(with_cache_status(StatusCode::OK, cache, product))
}

/// Handler for PUT /api/products/:sku
pub async fn update_product(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    payload: std::result::Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Response> {
    let patch = json_body(payload)?;
    let (product, cache) = state.products.update(&sku, patch).await?;
    Ok(with_cache_status(StatusCode::OK, cache, product))
}

/// Handler for DELETE /api/products/:sku
pub async fn delete_product(State(state): State<AppState>, Path(sku): Path<String>) -> Result<Response> {
    let (product, cache) = state.products.delete(&sku).await?;
    let body = ProductDeleted {
        message: format!("Product {} deleted", product.sku),
        deleted_sku: product.sku,
    };
    Ok(with_cache_status(StatusCode::OK, cache, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_status_header() {
        let response = with_cache_status(StatusCode::OK, CacheStatus::Hit, "x");
        assert_eq!(response.headers()[X_CACHE], "HIT");
    }
}
