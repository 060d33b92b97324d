//! Product Service
//!
//! Owns the write-path policy: commit to the store first, then update the
//! cache on a best-effort basis. Reads go through the catalog cache.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::catalog::cache::{CatalogCache, DEFAULT_OPERATION_TIMEOUT};
use crate::error::{AppError, Result, StoreError};
use crate::models::{
    validate_sku, BulkDeleteItem, BulkResponse, BulkUpdateItem, FieldError, NewProduct, Product,
    ProductPatch, Ratings,
};
use crate::store::{self, SharedStore};

/// Upper bound on search results per request
pub const MAX_SEARCH_LIMIT: usize = 100;

// == Cache Status ==
/// Which path served a product request; reported in the `X-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Refreshed,
    Deleted,
    BulkCreated,
    BulkRefreshed,
    BulkDeleted,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Refreshed => "REFRESHED",
            CacheStatus::Deleted => "DELETED",
            CacheStatus::BulkCreated => "BULK-CREATED",
            CacheStatus::BulkRefreshed => "BULK-REFRESHED",
            CacheStatus::BulkDeleted => "BULK-DELETED",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_sku(error: FieldError) -> AppError {
    AppError::Validation {
        message: "Invalid SKU format".to_string(),
        errors: vec![error],
    }
}

fn check_sku(sku: &str) -> Result<()> {
    match validate_sku(sku, "sku") {
        Some(error) => Err(invalid_sku(error)),
        None => Ok(()),
    }
}

// == Product Service ==
#[derive(Debug, Clone)]
pub struct ProductService {
    store: SharedStore,
    catalog: CatalogCache,
    deadline: Duration,
}

impl ProductService {
    pub fn new(store: SharedStore, catalog: CatalogCache) -> Self {
        Self {
            store,
            catalog,
            deadline: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    async fn bounded<T, F>(&self, fut: F) -> std::result::Result<T, StoreError>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        store::with_deadline(self.deadline, fut).await
    }

    // == Get ==
    /// Read-through lookup: cache first, then the store (caching what it finds).
    pub async fn get(&self, sku: &str) -> Result<(Product, CacheStatus)> {
        check_sku(sku)?;

        if let Some(product) = self.catalog.get_by_sku(sku).await {
            return Ok((product, CacheStatus::Hit));
        }

        let product = self.bounded(self.store.find_by_sku(sku)).await?;
        self.catalog.put(&product).await;
        Ok((product, CacheStatus::Miss))
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.bounded(self.store.list()).await?)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(self.bounded(self.store.categories()).await?)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("q", "Search query is required", "required"));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        Ok(self.bounded(self.store.search(query, limit)).await?)
    }

    // == Create ==
    /// Validates and inserts a batch of new products, then caches them.
    ///
    /// Any invalid item rejects the whole batch.
    pub async fn create_many(&self, requests: Vec<NewProduct>) -> Result<(Vec<Product>, CacheStatus)> {
        if requests.is_empty() {
            return Err(AppError::validation(
                "products",
                "At least one product is required",
                "empty_array",
            ));
        }

        let errors: Vec<FieldError> = requests
            .iter()
            .enumerate()
            .flat_map(|(i, req)| req.validate(&format!("[{}].", i)))
            .collect();
        if !errors.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid request data".to_string(),
                errors,
            });
        }

        let products: Vec<Product> = requests.into_iter().map(NewProduct::into_product).collect();
        let created = self.bounded(self.store.insert_many(products)).await?;

        let cached = self.catalog.put_many(&created).await;
        info!(count = created.len(), cached, "products created");
        Ok((created, CacheStatus::BulkCreated))
    }

    async fn patch_product(&self, sku: &str, patch: &ProductPatch) -> std::result::Result<Product, StoreError> {
        // The previous category is needed to move the SKU between category lists.
        let previous = match patch.category {
            Some(_) => Some(self.bounded(self.store.find_by_sku(sku)).await?),
            None => None,
        };

        let updated = self.bounded(self.store.update_fields(sku, patch)).await?;
        self.catalog.replace(previous.as_ref(), &updated).await;
        Ok(updated)
    }

    // == Update ==
    pub async fn update(&self, sku: &str, patch: ProductPatch) -> Result<(Product, CacheStatus)> {
        check_sku(sku)?;

        if patch.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one mutable field",
                "no_valid_updates",
            ));
        }
        let errors = patch.validate("");
        if !errors.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid update".to_string(),
                errors,
            });
        }

        let updated = self.patch_product(sku, &patch).await?;
        Ok((updated, CacheStatus::Refreshed))
    }

    // == Delete ==
    pub async fn delete(&self, sku: &str) -> Result<(Product, CacheStatus)> {
        check_sku(sku)?;

        let deleted = self.bounded(self.store.delete_by_sku(sku)).await?;
        self.catalog.remove(&deleted).await;
        info!(sku, "product deleted");
        Ok((deleted, CacheStatus::Deleted))
    }

    // == Ratings ==
    /// Stores recomputed review statistics and refreshes the cached document.
    pub async fn set_ratings(&self, sku: &str, ratings: Ratings) -> Result<Product> {
        let updated = self.bounded(self.store.set_ratings(sku, ratings)).await?;
        self.catalog.put(&updated).await;
        Ok(updated)
    }

    // == Bulk Update ==
    /// Applies each patch independently, collecting per-item errors.
    pub async fn bulk_update(&self, items: Vec<BulkUpdateItem>) -> Result<(BulkResponse<Product>, CacheStatus)> {
        if items.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one product update",
                "empty_updates",
            ));
        }

        let total = items.len();
        let mut updated = Vec::new();
        let mut errors = Vec::new();

        for (i, item) in items.into_iter().enumerate() {
            let Some(sku) = item.sku else {
                errors.push(FieldError::new(
                    format!("[{}].sku", i),
                    "SKU is required for each product update",
                    "missing_sku",
                ));
                continue;
            };
            if let Some(error) = validate_sku(&sku, &format!("[{}].sku", i)) {
                errors.push(FieldError { code: "invalid_sku_format".to_string(), ..error });
                continue;
            }
            if item.patch.is_empty() {
                errors.push(FieldError::new(
                    format!("[{}]", i),
                    format!("No valid fields to update for SKU {}", sku),
                    "no_valid_updates",
                ));
                continue;
            }
            let invalid = item.patch.validate(&format!("[{}].", i));
            if !invalid.is_empty() {
                errors.extend(invalid);
                continue;
            }

            match self.patch_product(&sku, &item.patch).await {
                Ok(product) => updated.push(product),
                Err(StoreError::NotFound(_)) => errors.push(FieldError::new(
                    format!("[{}].sku", i),
                    format!("No product exists with SKU {}", sku),
                    "not_found",
                )),
                Err(e) => {
                    error!(sku = %sku, error = %e, "bulk update failed");
                    errors.push(FieldError::new(
                        format!("[{}].sku", i),
                        format!("Failed to update product with SKU {}", sku),
                        "update_failed",
                    ));
                }
            }
        }

        if !errors.is_empty() {
            warn!(failed = errors.len(), total, "bulk update partially failed");
        }
        Ok((BulkResponse::new(updated, errors, total), CacheStatus::BulkRefreshed))
    }

    // == Bulk Delete ==
    /// Deletes each SKU independently; the response lists the deleted SKUs.
    pub async fn bulk_delete(&self, items: Vec<BulkDeleteItem>) -> Result<(BulkResponse<String>, CacheStatus)> {
        if items.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one object with SKU to delete",
                "empty_array",
            ));
        }

        let total = items.len();
        let mut deleted = Vec::new();
        let mut errors = Vec::new();

        for (i, BulkDeleteItem { sku }) in items.into_iter().enumerate() {
            if let Some(error) = validate_sku(&sku, &format!("[{}].sku", i)) {
                errors.push(error);
                continue;
            }

            match self.bounded(self.store.delete_by_sku(&sku)).await {
                Ok(product) => {
                    self.catalog.remove(&product).await;
                    deleted.push(product.sku);
                }
                Err(StoreError::NotFound(_)) => errors.push(FieldError::new(
                    format!("[{}].sku", i),
                    format!("No product exists with SKU {}", sku),
                    "not_found",
                )),
                Err(e) => {
                    error!(sku = %sku, error = %e, "bulk delete failed");
                    errors.push(FieldError::new(
                        format!("[{}].sku", i),
                        "Database error occurred",
                        "database_error",
                    ));
                }
            }
        }

        Ok((BulkResponse::new(deleted, errors, total), CacheStatus::BulkDeleted))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::cache::testing::UnavailableCache;
    use crate::cache::MemoryCache;
    use crate::models::product::fixtures;
    use crate::models::Stock;
    use crate::store::{InMemoryProductStore, ProductStore};

    async fn service_with(products: Vec<Product>) -> ProductService {
        let store = Arc::new(InMemoryProductStore::new());
        store.insert_many(products).await.unwrap();
        let catalog = CatalogCache::new(Arc::new(MemoryCache::new(1000)));
        ProductService::new(store, catalog)
    }

    async fn outage_service_with(products: Vec<Product>) -> ProductService {
        let store = Arc::new(InMemoryProductStore::new());
        store.insert_many(products).await.unwrap();
        ProductService::new(store, CatalogCache::new(Arc::new(UnavailableCache)))
    }

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            category: "Electronics".to_string(),
            subcategory: String::new(),
            brand: "Logitech".to_string(),
            price: 29.99,
            currency: "CAD".to_string(),
            images: vec![],
            attributes: HashMap::new(),
            tags: vec![],
        }
    }

    fn price_patch(price: f64) -> ProductPatch {
        ProductPatch {
            price: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_status_header_values() {
        assert_eq!(CacheStatus::Hit.as_str(), "HIT");
        assert_eq!(CacheStatus::BulkRefreshed.to_string(), "BULK-REFRESHED");
    }

    #[tokio::test]
    async fn test_get_miss_then_hit() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;

        let (_, status) = service.get("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);

        let (product, status) = service.get("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(product.sku, "ACM-ELE-1");
    }

    #[tokio::test]
    async fn test_get_unknown_sku_is_not_found() {
        let service = service_with(vec![]).await;
        assert!(matches!(service.get("UNKNOWN-SKU").await, Err(AppError::NotFound(_))));
        // No negative caching
        assert!(matches!(service.get("UNKNOWN-SKU").await, Err(AppError::NotFound(_))));
        assert_eq!(service.catalog().stats().await.misses, 2);
    }

    #[tokio::test]
    async fn test_get_rejects_bad_sku() {
        let service = service_with(vec![]).await;
        assert!(matches!(service.get("AB").await, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        service.get("ACM-ELE-1").await.unwrap();

        let (updated, status) = service.update("ACM-ELE-1", price_patch(12.5)).await.unwrap();
        assert_eq!(status, CacheStatus::Refreshed);
        assert_eq!(updated.price, 12.5);

        let (cached, status) = service.get("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(cached.price, 12.5);
    }

    #[tokio::test]
    async fn test_update_recalculates_stock() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        let patch = ProductPatch {
            stock: Some(Stock {
                warehouse_main: 1,
                warehouse_east: 2,
                warehouse_west: 3,
                total: 0,
            }),
            ..Default::default()
        };

        let (updated, _) = service.update("ACM-ELE-1", patch).await.unwrap();
        assert_eq!(updated.stock.total, 6);
    }

    #[tokio::test]
    async fn test_update_category_moves_list_membership() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        service.get("ACM-ELE-1").await.unwrap();

        let patch = ProductPatch {
            category: Some("Kitchen".to_string()),
            ..Default::default()
        };
        service.update("ACM-ELE-1", patch).await.unwrap();

        assert!(service.catalog().category_skus("Electronics").await.is_empty());
        assert_eq!(service.catalog().category_skus("Kitchen").await, vec!["ACM-ELE-1"]);
    }

    #[tokio::test]
    async fn test_update_empty_patch_rejected() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        let result = service.update("ACM-ELE-1", ProductPatch::default()).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let service = service_with(vec![]).await;
        let result = service.update("NOPE-1", price_patch(1.0)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_ratings_refreshes_cache() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        service.get("ACM-ELE-1").await.unwrap();

        let ratings = Ratings { average: 4.0, count: 1 };
        service.set_ratings("ACM-ELE-1", ratings.clone()).await.unwrap();

        let (cached, status) = service.get("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(cached.ratings, ratings);
    }

    #[tokio::test]
    async fn test_delete_evicts_cache() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        service.get("ACM-ELE-1").await.unwrap();

        let (deleted, status) = service.delete("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Deleted);
        assert_eq!(deleted.sku, "ACM-ELE-1");

        assert!(service.catalog().get_by_sku("ACM-ELE-1").await.is_none());
        assert!(matches!(service.get("ACM-ELE-1").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_many_caches_products() {
        let service = service_with(vec![]).await;
        let (created, status) = service
            .create_many(vec![new_product("Wireless Mouse"), new_product("Keyboard")])
            .await
            .unwrap();

        assert_eq!(status, CacheStatus::BulkCreated);
        assert_eq!(created.len(), 2);
        for product in &created {
            assert!(service.catalog().get_by_sku(&product.sku).await.is_some());
        }
        assert_eq!(service.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_many_rejects_invalid_batch() {
        let service = service_with(vec![]).await;
        let mut bad = new_product("Keyboard");
        bad.price = -1.0;

        match service.create_many(vec![new_product("Mouse"), bad]).await {
            Err(AppError::Validation { errors, .. }) => assert_eq!(errors[0].field, "[1].price"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_many_empty_rejected() {
        let service = service_with(vec![]).await;
        assert!(matches!(service.create_many(vec![]).await, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_bulk_update_partial_success() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        let items = vec![
            BulkUpdateItem {
                sku: Some("ACM-ELE-1".to_string()),
                patch: price_patch(11.0),
            },
            BulkUpdateItem {
                sku: None,
                patch: price_patch(11.0),
            },
            BulkUpdateItem {
                sku: Some("NOPE-1".to_string()),
                patch: price_patch(11.0),
            },
            BulkUpdateItem {
                sku: Some("ACM-ELE-1".to_string()),
                patch: ProductPatch::default(),
            },
        ];

        let (response, status) = service.bulk_update(items).await.unwrap();
        assert_eq!(status, CacheStatus::BulkRefreshed);
        assert_eq!(response.success_count, 1);
        assert_eq!(response.total_requested, 4);
        let codes: Vec<&str> = response.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["missing_sku", "not_found", "no_valid_updates"]);
        assert_eq!(response.errors[0].field, "[1].sku");
    }

    #[tokio::test]
    async fn test_bulk_delete_partial_success() {
        let service = service_with(vec![
            fixtures::product("ACM-ELE-1", 10.0),
            fixtures::product("ACM-ELE-2", 10.0),
        ])
        .await;
        let items = vec![
            BulkDeleteItem { sku: "ACM-ELE-1".to_string() },
            BulkDeleteItem { sku: "X".to_string() },
            BulkDeleteItem { sku: "ACM-ELE-2".to_string() },
            BulkDeleteItem { sku: "ACM-ELE-1".to_string() },
        ];

        let (response, status) = service.bulk_delete(items).await.unwrap();
        assert_eq!(status, CacheStatus::BulkDeleted);
        assert_eq!(response.items, vec!["ACM-ELE-1", "ACM-ELE-2"]);
        assert_eq!(response.error_count, Some(2));
        assert_eq!(response.errors[0].code, "invalid_format");
        assert_eq!(response.errors[1].code, "not_found");
    }

    #[tokio::test]
    async fn test_search_validates_query() {
        let service = service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;
        assert!(matches!(service.search("  ", 10).await, Err(AppError::Validation { .. })));
        assert_eq!(service.search("acme", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_outage_does_not_fail_requests() {
        let service = outage_service_with(vec![fixtures::product("ACM-ELE-1", 10.0)]).await;

        let (_, status) = service.get("ACM-ELE-1").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);

        let (updated, _) = service.update("ACM-ELE-1", price_patch(3.0)).await.unwrap();
        assert_eq!(updated.price, 3.0);

        let (created, _) = service.create_many(vec![new_product("Mouse")]).await.unwrap();
        assert_eq!(created.len(), 1);

        service.delete("ACM-ELE-1").await.unwrap();
        assert_eq!(service.catalog().stats().await.write_failures, 4);
    }
}
