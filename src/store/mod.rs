//! Document Store Module
//!
//! The persistent source of truth for products, customers, orders and reviews.
//! The catalog reads through the cache into the product store and always
//! commits here before touching the cache.

mod customers;
mod memory;
mod orders;
mod postgres;
mod reviews;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Product, ProductPatch, Ratings};

pub use customers::{CustomerStore, InMemoryCustomerStore, SharedCustomerStore};
pub use memory::InMemoryProductStore;
pub use orders::{InMemoryOrderStore, OrderStore, SharedOrderStore};
pub use postgres::{PostgresConfig, PostgresStore};
pub use reviews::{InMemoryReviewStore, ReviewStore, SharedReviewStore};

// == Product Store Trait ==
#[async_trait]
pub trait ProductStore: Send + Sync + fmt::Debug {
    /// Fails with `StoreError::NotFound` when no product has this SKU.
    async fn find_by_sku(&self, sku: &str) -> Result<Product, StoreError>;

    /// All products, oldest first.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Inserts the batch; a SKU collision rejects the whole batch with `Duplicate`.
    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, StoreError>;

    /// Applies a patch and returns the updated document.
    async fn update_fields(&self, sku: &str, patch: &ProductPatch) -> Result<Product, StoreError>;

    /// Deletes by SKU, returning the removed document.
    async fn delete_by_sku(&self, sku: &str) -> Result<Product, StoreError>;

    /// Distinct categories, case-insensitive, sorted.
    async fn categories(&self) -> Result<Vec<String>, StoreError>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, StoreError>;

    /// Replaces the review statistics without touching `updated_at`.
    async fn set_ratings(&self, sku: &str, ratings: Ratings) -> Result<Product, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn ProductStore>;

/// Handles to every document store the service uses.
#[derive(Debug, Clone)]
pub struct Stores {
    pub products: SharedStore,
    pub customers: SharedCustomerStore,
    pub orders: SharedOrderStore,
    pub reviews: SharedReviewStore,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductStore::new()),
            customers: Arc::new(InMemoryCustomerStore::new()),
            orders: Arc::new(InMemoryOrderStore::new()),
            reviews: Arc::new(InMemoryReviewStore::new()),
        }
    }

    /// Every store backed by the same connection pool.
    pub fn postgres(store: PostgresStore) -> Self {
        let store = Arc::new(store);
        Self {
            products: store.clone(),
            customers: store.clone(),
            orders: store.clone(),
            reviews: store,
        }
    }
}

/// Runs a store call under a deadline, mapping elapsed deadlines to `StoreError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| StoreError::Timeout(deadline))?
}

/// Collapses categories case-insensitively, keeping the first spelling seen.
pub(crate) fn distinct_categories<'a>(categories: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut distinct: Vec<String> = categories
        .into_iter()
        .filter(|category| seen.insert(category.to_lowercase()))
        .map(str::to_string)
        .collect();
    distinct.sort();
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_categories() {
        let categories = distinct_categories(["Kitchen", "electronics", "Electronics", "kitchen"]);
        assert_eq!(categories, vec!["Kitchen", "electronics"]);
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), StoreError> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }
}
