//! Catalog Cache Manager
//!
//! Read-through cache of product documents in front of the product store.
//! Every failure inside this module degrades to a miss or a skipped write;
//! callers never see a cache error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{with_deadline, CacheCounters, CacheStats, Pipeline, SharedCache};
use crate::catalog::keys::{category_key, product_key, sku_key, RECENT_PRODUCTS_KEY};
use crate::error::CacheError;
use crate::models::Product;

/// Default lifetime of cached product entries and lists
pub const DEFAULT_PRODUCT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default length cap of the recent-products list
pub const DEFAULT_RECENT_LIMIT: usize = 100;
/// Default deadline for a single cache round trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

// == Cache Write ==
/// Outcome of a best-effort cache write.
///
/// Callers may drop it; failures are already logged and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Written,
    Failed,
}

impl CacheWrite {
    pub fn is_written(self) -> bool {
        self == CacheWrite::Written
    }
}

// == Catalog Cache ==
#[derive(Debug, Clone)]
pub struct CatalogCache {
    cache: SharedCache,
    ttl: Duration,
    recent_limit: usize,
    deadline: Duration,
    counters: Arc<CacheCounters>,
}

impl CatalogCache {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            ttl: DEFAULT_PRODUCT_TTL,
            recent_limit: DEFAULT_RECENT_LIMIT,
            deadline: DEFAULT_OPERATION_TIMEOUT,
            counters: Arc::new(CacheCounters::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    pub fn with_operation_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    // == Get By SKU ==
    /// Looks a product up through the SKU index.
    ///
    /// Returns `None` on absence, expiry, corrupt payloads, timeouts or outages;
    /// the caller then falls back to the store.
    pub async fn get_by_sku(&self, sku: &str) -> Option<Product> {
        match with_deadline(self.deadline, self.lookup(sku)).await {
            Ok(Some(product)) => {
                self.counters.record_hit();
                debug!(sku, "catalog cache hit");
                Some(product)
            }
            Ok(None) => {
                self.counters.record_miss();
                debug!(sku, "catalog cache miss");
                None
            }
            Err(e) => {
                self.counters.record_miss();
                warn!(sku, error = %e, "catalog cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn lookup(&self, sku: &str) -> Result<Option<Product>, CacheError> {
        let Some(target) = self.cache.get(&sku_key(sku)).await? else {
            return Ok(None);
        };
        let Some(json) = self.cache.get(&product_key(&target)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn stage_put(&self, pipe: &mut Pipeline, product: &Product, json: String) {
        let sku = product.sku.as_str();
        let category = category_key(&product.category);

        pipe.set(product_key(sku), json, self.ttl)
            .set(sku_key(sku), sku, self.ttl)
            // remove-before-push keeps one entry per SKU in each list
            .list_remove(category.clone(), sku)
            .list_push(category.clone(), sku)
            .expire(category, self.ttl)
            .list_remove(RECENT_PRODUCTS_KEY, sku)
            .list_push(RECENT_PRODUCTS_KEY, sku)
            .list_trim(RECENT_PRODUCTS_KEY, 0, self.recent_limit as isize - 1)
            .expire(RECENT_PRODUCTS_KEY, self.ttl);
    }

    // == Put ==
    /// Caches a product and indexes it in its category and recent lists atomically.
    pub async fn put(&self, product: &Product) -> CacheWrite {
        self.replace(None, product).await
    }

    /// Like `put`, also dropping the SKU from `previous`'s category list when
    /// the category changed.
    pub async fn replace(&self, previous: Option<&Product>, product: &Product) -> CacheWrite {
        let json = match serde_json::to_string(product) {
            Ok(json) => json,
            Err(e) => return self.write_failed(&product.sku, &CacheError::from(e)),
        };

        let mut pipe = Pipeline::new();
        if let Some(previous) = previous.filter(|p| p.category != product.category) {
            pipe.list_remove(category_key(&previous.category), previous.sku.as_str());
        }
        self.stage_put(&mut pipe, product, json);

        self.commit(&product.sku, pipe).await
    }

    // == Remove ==
    /// Evicts a product and its list memberships atomically.
    pub async fn remove(&self, product: &Product) -> CacheWrite {
        let sku = product.sku.as_str();
        let mut pipe = Pipeline::new();
        pipe.delete(product_key(sku))
            .delete(sku_key(sku))
            .list_remove(category_key(&product.category), sku)
            .list_remove(RECENT_PRODUCTS_KEY, sku);

        self.commit(sku, pipe).await
    }

    // == Put Many ==
    /// Caches each product independently; one failure does not stop the rest.
    ///
    /// Returns how many products were written.
    pub async fn put_many(&self, products: &[Product]) -> usize {
        let mut written = 0;
        for product in products {
            if self.put(product).await.is_written() {
                written += 1;
            }
        }
        written
    }

    /// Most recently cached SKUs, newest first.
    pub async fn recent_skus(&self, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        self.read_list(RECENT_PRODUCTS_KEY, limit as isize - 1).await
    }

    pub async fn category_skus(&self, category: &str) -> Vec<String> {
        self.read_list(&category_key(category), -1).await
    }

    async fn read_list(&self, key: &str, stop: isize) -> Vec<String> {
        match with_deadline(self.deadline, self.cache.list_range(key, 0, stop)).await {
            Ok(skus) => skus,
            Err(e) => {
                warn!(key, error = %e, "catalog list read failed");
                Vec::new()
            }
        }
    }

    /// Snapshot of lookup counters plus the backend key count.
    pub async fn stats(&self) -> CacheStats {
        let entries = match with_deadline(self.deadline, self.cache.size()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache size unavailable");
                0
            }
        };
        self.counters.snapshot(entries)
    }

    /// Whether the backend answers a ping within the deadline.
    pub async fn is_available(&self) -> bool {
        with_deadline(self.deadline, self.cache.ping()).await.is_ok()
    }

    async fn commit(&self, sku: &str, pipe: Pipeline) -> CacheWrite {
        match with_deadline(self.deadline, self.cache.execute(pipe)).await {
            Ok(()) => CacheWrite::Written,
            Err(e) => self.write_failed(sku, &e),
        }
    }

    fn write_failed(&self, sku: &str, error: &CacheError) -> CacheWrite {
        self.counters.record_write_failure();
        warn!(sku, error = %error, "catalog cache write failed; store remains authoritative");
        CacheWrite::Failed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::UnavailableCache;
    use crate::cache::{CacheBackend, MemoryCache};
    use crate::models::product::fixtures;

    fn catalog() -> (CatalogCache, Arc<MemoryCache>) {
        let memory = Arc::new(MemoryCache::new(1000));
        (CatalogCache::new(memory.clone()), memory)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let (catalog, _) = catalog();
        let product = fixtures::product("ACM-ELE-1", 19.99);

        assert_eq!(catalog.put(&product).await, CacheWrite::Written);
        assert_eq!(catalog.get_by_sku("ACM-ELE-1").await, Some(product));
    }

    #[tokio::test]
    async fn test_put_then_remove_is_miss() {
        let (catalog, memory) = catalog();
        let product = fixtures::product("ACM-ELE-1", 19.99);

        catalog.put(&product).await;
        assert_eq!(catalog.remove(&product).await, CacheWrite::Written);

        assert_eq!(catalog.get_by_sku("ACM-ELE-1").await, None);
        assert!(catalog.recent_skus(10).await.is_empty());
        assert!(catalog.category_skus("Electronics").await.is_empty());
        assert!(!memory.exists("sku:ACM-ELE-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_sku_is_miss() {
        let (catalog, _) = catalog();
        assert_eq!(catalog.get_by_sku("UNKNOWN-SKU").await, None);

        let stats = catalog.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_index_without_body_is_miss() {
        let (catalog, memory) = catalog();
        let mut pipe = Pipeline::new();
        pipe.set(sku_key("ORPHAN-1"), "ORPHAN-1", Duration::from_secs(60));
        memory.execute(pipe).await.unwrap();

        assert_eq!(catalog.get_by_sku("ORPHAN-1").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_miss() {
        let (catalog, memory) = catalog();
        let mut pipe = Pipeline::new();
        pipe.set(sku_key("BAD-1"), "BAD-1", Duration::from_secs(60))
            .set(product_key("BAD-1"), "{not json", Duration::from_secs(60));
        memory.execute(pipe).await.unwrap();

        assert_eq!(catalog.get_by_sku("BAD-1").await, None);
    }

    #[tokio::test]
    async fn test_repeated_put_does_not_duplicate_list_entries() {
        let (catalog, _) = catalog();
        let product = fixtures::product("ACM-ELE-1", 19.99);

        catalog.put(&product).await;
        catalog.put(&product).await;
        catalog.put(&fixtures::product("ACM-ELE-2", 5.0)).await;

        assert_eq!(catalog.recent_skus(10).await, vec!["ACM-ELE-2", "ACM-ELE-1"]);
        assert_eq!(catalog.category_skus("Electronics").await.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_list_is_capped() {
        let memory = Arc::new(MemoryCache::new(1000));
        let catalog = CatalogCache::new(memory).with_recent_limit(3);

        for i in 0..5 {
            catalog.put(&fixtures::product(&format!("SKU-{}", i), 1.0)).await;
        }

        assert_eq!(catalog.recent_skus(100).await, vec!["SKU-4", "SKU-3", "SKU-2"]);
    }

    #[tokio::test]
    async fn test_replace_moves_category_membership() {
        let (catalog, _) = catalog();
        let before = fixtures::product("ACM-ELE-1", 19.99);
        let mut after = before.clone();
        after.category = "Kitchen".to_string();

        catalog.put(&before).await;
        catalog.replace(Some(&before), &after).await;

        assert!(catalog.category_skus("Electronics").await.is_empty());
        assert_eq!(catalog.category_skus("Kitchen").await, vec!["ACM-ELE-1"]);
        assert_eq!(catalog.get_by_sku("ACM-ELE-1").await.unwrap().category, "Kitchen");
    }

    #[tokio::test]
    async fn test_entries_expire_with_ttl() {
        let memory = Arc::new(MemoryCache::new(1000));
        let catalog = CatalogCache::new(memory).with_ttl(Duration::from_millis(50));
        catalog.put(&fixtures::product("ACM-ELE-1", 1.0)).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(catalog.get_by_sku("ACM-ELE-1").await, None);
    }

    #[tokio::test]
    async fn test_outage_degrades_to_miss() {
        let catalog = CatalogCache::new(Arc::new(UnavailableCache));
        let product = fixtures::product("ACM-ELE-1", 1.0);

        assert_eq!(catalog.put(&product).await, CacheWrite::Failed);
        assert_eq!(catalog.remove(&product).await, CacheWrite::Failed);
        assert_eq!(catalog.get_by_sku("ACM-ELE-1").await, None);
        assert!(catalog.recent_skus(5).await.is_empty());
        assert!(!catalog.is_available().await);

        let stats = catalog.stats().await;
        assert_eq!(stats.write_failures, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn test_put_many_continues_after_failure() {
        let (catalog, memory) = catalog();

        // A string at the category key makes list commands for that category fail.
        let mut pipe = Pipeline::new();
        pipe.set(category_key("Broken"), "x", Duration::from_secs(60));
        memory.execute(pipe).await.unwrap();

        let mut broken = fixtures::product("BRK-1", 1.0);
        broken.category = "Broken".to_string();
        let products = vec![fixtures::product("OK-1", 1.0), broken, fixtures::product("OK-2", 1.0)];

        assert_eq!(catalog.put_many(&products).await, 2);
        assert!(catalog.get_by_sku("OK-2").await.is_some());
        assert!(catalog.get_by_sku("BRK-1").await.is_none());
    }
}
