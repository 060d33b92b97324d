//! In-memory product store used for development and tests.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{Product, ProductPatch, Ratings};
use crate::store::{distinct_categories, ProductStore};

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<BTreeMap<String, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(sku: &str) -> StoreError {
    StoreError::NotFound(format!("product with SKU '{}'", sku))
}

fn oldest_first(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.sku.cmp(&b.sku)));
    products
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_sku(&self, sku: &str) -> Result<Product, StoreError> {
        self.products
            .read()
            .await
            .get(sku)
            .cloned()
            .ok_or_else(|| not_found(sku))
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(oldest_first(products.values().cloned().collect()))
    }

    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, StoreError> {
        let mut stored = self.products.write().await;

        let mut batch = HashSet::new();
        for product in &products {
            if stored.contains_key(&product.sku) || !batch.insert(product.sku.as_str()) {
                return Err(StoreError::Duplicate(format!("sku '{}'", product.sku)));
            }
        }

        for product in &products {
            stored.insert(product.sku.clone(), product.clone());
        }
        Ok(products)
    }

    async fn update_fields(&self, sku: &str, patch: &ProductPatch) -> Result<Product, StoreError> {
        let mut stored = self.products.write().await;
        let product = stored.get_mut(sku).ok_or_else(|| not_found(sku))?;
        patch.apply_to(product);
        Ok(product.clone())
    }

    async fn delete_by_sku(&self, sku: &str) -> Result<Product, StoreError> {
        self.products
            .write()
            .await
            .remove(sku)
            .ok_or_else(|| not_found(sku))
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let products = oldest_first(self.products.read().await.values().cloned().collect());
        Ok(distinct_categories(products.iter().map(|p| p.category.as_str())))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        let matches = products
            .values()
            .filter(|product| product.matches_query(query))
            .cloned()
            .collect();
        Ok(oldest_first(matches).into_iter().take(limit).collect())
    }

    async fn set_ratings(&self, sku: &str, ratings: Ratings) -> Result<Product, StoreError> {
        let mut stored = self.products.write().await;
        let product = stored.get_mut(sku).ok_or_else(|| not_found(sku))?;
        product.ratings = ratings;
        Ok(product.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
