//! Review Handlers
//!
//! Reviews are nested under their product; update and delete only match a
//! review of the product named in the path.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::handlers::{json_body, path_param, AppState};
use crate::error::Result;
use crate::models::{ApiResponse, NewReview, Review, ReviewDeleted, ReviewPatch};

/// Handler for GET /api/products/:sku/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<ApiResponse<Vec<Review>>>> {
    Ok(Json(ApiResponse::ok(state.reviews.list_for_product(&sku).await?)))
}

/// Handler for POST /api/products/:sku/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    payload: std::result::Result<Json<NewReview>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>)> {
    let request = json_body(payload)?;
    let review = state.reviews.create(&sku, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(review))))
}

/// Handler for PUT /api/products/:sku/reviews/:review_id
pub async fn update_review(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, Uuid)>, PathRejection>,
    payload: std::result::Result<Json<ReviewPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<Review>>> {
    let (sku, review_id) = path_param(path, "review_id")?;
    let patch = json_body(payload)?;
    Ok(Json(ApiResponse::ok(
        state.reviews.update(&sku, review_id, patch).await?,
    )))
}

/// Handler for DELETE /api/products/:sku/reviews/:review_id
pub async fn delete_review(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, Uuid)>, PathRejection>,
) -> Result<Json<ApiResponse<ReviewDeleted>>> {
    let (sku, review_id) = path_param(path, "review_id")?;
    let review = state.reviews.delete(&sku, review_id).await?;
    Ok(Json(ApiResponse::ok(ReviewDeleted {
        deleted_review_id: review.id,
        review,
    })))
}
