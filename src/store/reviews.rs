//! Review storage. A customer reviews a product at most once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Review, ReviewPatch};

// == Review Store Trait ==
#[async_trait]
pub trait ReviewStore: Send + Sync + fmt::Debug {
    /// Fails with `Duplicate` when the customer already reviewed the product.
    async fn insert(&self, review: Review) -> Result<Review, StoreError>;

    /// Reviews of a product, oldest first.
    async fn list_by_product(&self, sku: &str) -> Result<Vec<Review>, StoreError>;

    /// Reviews written by a customer, oldest first.
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Review>, StoreError>;

    /// Only matches a review that belongs to `sku`.
    async fn update_fields(&self, sku: &str, id: Uuid, patch: &ReviewPatch) -> Result<Review, StoreError>;

    /// Only matches a review that belongs to `sku`.
    async fn delete(&self, sku: &str, id: Uuid) -> Result<Review, StoreError>;
}

pub type SharedReviewStore = Arc<dyn ReviewStore>;

pub(crate) fn review_not_found(sku: &str, id: Uuid) -> StoreError {
    StoreError::NotFound(format!("review '{}' for product '{}'", id, sku))
}

fn oldest_first(mut reviews: Vec<Review>) -> Vec<Review> {
    reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    reviews
}

// == In-Memory Review Store ==
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    reviews: RwLock<HashMap<Uuid, Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: Review) -> Result<Review, StoreError> {
        let mut reviews = self.reviews.write().await;
        let exists = reviews
            .values()
            .any(|r| r.product_sku == review.product_sku && r.customer_id == review.customer_id);
        if exists {
            return Err(StoreError::Duplicate(format!(
                "review of '{}' by customer '{}'",
                review.product_sku, review.customer_id
            )));
        }
        reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn list_by_product(&self, sku: &str) -> Result<Vec<Review>, StoreError> {
        let reviews = self.reviews.read().await;
        Ok(oldest_first(
            reviews.values().filter(|r| r.product_sku == sku).cloned().collect(),
        ))
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let reviews = self.reviews.read().await;
        Ok(oldest_first(
            reviews
                .values()
                .filter(|r| r.customer_id == customer_id)
                .cloned()
                .collect(),
        ))
    }

    async fn update_fields(&self, sku: &str, id: Uuid, patch: &ReviewPatch) -> Result<Review, StoreError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews
            .get_mut(&id)
            .filter(|r| r.product_sku == sku)
            .ok_or_else(|| review_not_found(sku, id))?;
        patch.apply_to(review);
        Ok(review.clone())
    }

    async fn delete(&self, sku: &str, id: Uuid) -> Result<Review, StoreError> {
        let mut reviews = self.reviews.write().await;
        match reviews.get(&id) {
            Some(review) if review.product_sku == sku => {
                reviews.remove(&id).ok_or_else(|| review_not_found(sku, id))
            }
            _ => Err(review_not_found(sku, id)),
        }
    }
}
