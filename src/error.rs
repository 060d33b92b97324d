//! Error types for the catalog service
//!
//! Provides unified error handling using thiserror. Cache and store errors stay
//! inside their layers; only `AppError` is turned into an HTTP response.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::{ApiResponse, FieldError};

// == Cache Error Enum ==
/// Failures raised by a cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached or rejected the command
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded its deadline
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// Key or value violates backend limits
    #[error("Invalid cache request: {0}")]
    InvalidRequest(String),

    /// Command applied to a key holding another value type
    #[error("Wrong value type for key: {0}")]
    WrongType(String),

    /// Cached payload could not be encoded or decoded
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

// == Store Error Enum ==
/// Failures raised by the persistent product store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Backend(String),

    /// Address book edit rejected under the row lock
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Status change rejected against the stored order
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

// == Cart Error Enum ==
/// Failures raised by the cart aggregate store.
#[derive(Error, Debug)]
pub enum CartError {
    /// SKU is not currently in the cart
    #[error("Item not found in cart: {0}")]
    ItemNotFound(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

// == Address Error Enum ==
/// Failures raised when editing a customer's address book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address not found at index {0}")]
    NotFound(usize),

    /// A customer always keeps one address
    #[error("Cannot delete last address")]
    LastAddress,
}

/// An order status change outside the allowed lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot change order status from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

// == App Error Enum ==
/// Error type surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Request rejected before touching store or cache
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Builds a validation error for a single field.
    pub fn validation(field: &str, message: impl Into<String>, code: &str) -> Self {
        let message = message.into();
        AppError::Validation {
            errors: vec![FieldError::new(field, message.clone(), code)],
            message,
        }
    }

    /// Maps a store failure for `entity`, so a miss reads "Order not found" and not "Product not found".
    pub fn store(entity: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(format!("{} not found", entity)),
            other => AppError::from(other),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
            StoreError::Duplicate(msg) => AppError::Conflict(format!("Duplicate entry: {}", msg)),
            StoreError::Address(err) => AppError::from(err),
            StoreError::Transition(err) => AppError::from(err),
            StoreError::Timeout(_) | StoreError::Backend(_) => {
                error!(error = %err, "store operation failed");
                AppError::Internal("Database operation failed".to_string())
            }
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound(sku) => AppError::NotFound(format!(
                "Item with SKU '{}' does not exist in cart",
                sku
            )),
            CartError::InvalidQuantity(_) => {
                AppError::validation("quantity", err.to_string(), "invalid_quantity")
            }
            CartError::Cache(cache_err) => {
                error!(error = %cache_err, "cart storage failed");
                AppError::Internal("Cart storage failed".to_string())
            }
        }
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::NotFound(_) => AppError::NotFound("Address not found".to_string()),
            AddressError::LastAddress => {
                AppError::validation("index", err.to_string(), "invalid_operation")
            }
        }
    }
}

impl From<StatusTransitionError> for AppError {
    fn from(err: StatusTransitionError) -> Self {
        AppError::validation("status", err.to_string(), "invalid_status_transition")
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation { message, errors } => ApiResponse::<()>::error(message, errors),
            other => ApiResponse::<()>::error(other.to_string(), Vec::new()),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, AppError>;
