//! Review Service
//!
//! Every review write recomputes the product's rating statistics from the
//! stored reviews and pushes them through the product service, so cached
//! product documents pick them up.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{ProductService, DEFAULT_OPERATION_TIMEOUT};
use crate::error::{AppError, Result, StoreError};
use crate::models::review::ratings_for;
use crate::models::{NewReview, Review, ReviewPatch};
use crate::store::{self, SharedCustomerStore, SharedOrderStore, SharedReviewStore};

const ENTITY: &str = "Review";

#[derive(Debug, Clone)]
pub struct ReviewService {
    reviews: SharedReviewStore,
    customers: SharedCustomerStore,
    orders: SharedOrderStore,
    products: ProductService,
    deadline: Duration,
}

impl ReviewService {
    pub fn new(
        reviews: SharedReviewStore,
        customers: SharedCustomerStore,
        orders: SharedOrderStore,
        products: ProductService,
    ) -> Self {
        Self {
            reviews,
            customers,
            orders,
            products,
            deadline: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn bounded<T, F>(&self, fut: F) -> std::result::Result<T, StoreError>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        store::with_deadline(self.deadline, fut).await
    }

    pub async fn list_for_product(&self, sku: &str) -> Result<Vec<Review>> {
        self.products.get(sku).await?;
        Ok(self.bounded(self.reviews.list_by_product(sku)).await?)
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Review>> {
        self.bounded(self.customers.find_by_id(customer_id))
            .await
            .map_err(|e| AppError::store("Customer", e))?;
        Ok(self.bounded(self.reviews.list_by_customer(customer_id)).await?)
    }

    /// A cited order must belong to the reviewer and contain the product.
    async fn verify_purchase(&self, sku: &str, customer_id: Uuid, order_number: &str) -> Result<()> {
        let order = match self.bounded(self.orders.find_by_number(order_number)).await {
            Ok(order) if order.customer_id == customer_id => order,
            Ok(_) | Err(StoreError::NotFound(_)) => {
                return Err(AppError::validation(
                    "order_number",
                    "Order not found or does not belong to customer",
                    "invalid_order",
                ))
            }
            Err(e) => return Err(AppError::from(e)),
        };

        if !order.items.iter().any(|item| item.sku == sku) {
            return Err(AppError::validation(
                "order_number",
                "Product not found in the specified order",
                "product_not_in_order",
            ));
        }
        Ok(())
    }

    // == Create ==
    pub async fn create(&self, sku: &str, request: NewReview) -> Result<Review> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid review".to_string(),
                errors,
            });
        }

        self.products.get(sku).await?;
        self.bounded(self.customers.find_by_id(request.customer_id))
            .await
            .map_err(|e| AppError::store("Customer", e))?;

        let verified = match request.order_number.as_deref() {
            Some(order_number) => {
                self.verify_purchase(sku, request.customer_id, order_number).await?;
                true
            }
            None => false,
        };

        let review = match self.bounded(self.reviews.insert(request.into_review(sku, verified))).await {
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict(
                    "Customer has already reviewed this product".to_string(),
                ))
            }
            other => other?,
        };
        info!(sku, review_id = %review.id, rating = review.rating, "review created");

        self.refresh_ratings(sku).await;
        Ok(review)
    }

    // == Update ==
    pub async fn update(&self, sku: &str, id: Uuid, patch: ReviewPatch) -> Result<Review> {
        if patch.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one of rating, title or comment",
                "no_valid_updates",
            ));
        }
        let errors = patch.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid review".to_string(),
                errors,
            });
        }

        let review = self
            .bounded(self.reviews.update_fields(sku, id, &patch))
            .await
            .map_err(|e| AppError::store(ENTITY, e))?;

        if patch.rating.is_some() {
            self.refresh_ratings(sku).await;
        }
        Ok(review)
    }

    // == Delete ==
    pub async fn delete(&self, sku: &str, id: Uuid) -> Result<Review> {
        let review = self
            .bounded(self.reviews.delete(sku, id))
            .await
            .map_err(|e| AppError::store(ENTITY, e))?;
        info!(sku, review_id = %id, "review deleted");

        self.refresh_ratings(sku).await;
        Ok(review)
    }

    /// Best effort: the review write is already committed, so a failure here
    /// only leaves stale statistics until the next review write.
    async fn refresh_ratings(&self, sku: &str) {
        let reviews = match self.bounded(self.reviews.list_by_product(sku)).await {
            Ok(reviews) => reviews,
            Err(e) => {
                warn!(sku, error = %e, "ratings not refreshed");
                return;
            }
        };
        if let Err(e) = self.products.set_ratings(sku, ratings_for(&reviews)).await {
            warn!(sku, error = %e, "ratings not refreshed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::MemoryCache;
    use crate::catalog::CatalogCache;
    use crate::models::customer::fixtures as customer_fixtures;
    use crate::models::order::fixtures as order_fixtures;
    use crate::models::product::fixtures as product_fixtures;
    use crate::models::review::fixtures;
    use crate::models::order::OrderItem;
    use crate::store::{
        CustomerStore, InMemoryCustomerStore, InMemoryOrderStore, InMemoryProductStore,
        InMemoryReviewStore, OrderStore, ProductStore,
    };

    struct Harness {
        service: ReviewService,
        products: ProductService,
        orders: Arc<InMemoryOrderStore>,
        customer: Uuid,
    }

    async fn harness() -> Harness {
        let product_store = Arc::new(InMemoryProductStore::new());
        product_store
            .insert_many(vec![
                product_fixtures::product("A-1", 20.0),
                product_fixtures::product("B-1", 5.0),
            ])
            .await
            .unwrap();
        let products = ProductService::new(
            product_store,
            CatalogCache::new(Arc::new(MemoryCache::new(1000))),
        );

        let customers = Arc::new(InMemoryCustomerStore::new());
        let customer = customers
            .insert(customer_fixtures::customer("ada@example.com"))
            .await
            .unwrap()
            .id;
        let orders = Arc::new(InMemoryOrderStore::new());

        let service = ReviewService::new(
            Arc::new(InMemoryReviewStore::new()),
            customers,
            orders.clone(),
            products.clone(),
        );
        Harness {
            service,
            products,
            orders,
            customer,
        }
    }

    #[tokio::test]
    async fn test_reviews_feed_product_ratings() {
        let h = harness().await;
        // Warm the cache so the refresh has to replace a cached document
        h.products.get("A-1").await.unwrap();

        let review = h
            .service
            .create("A-1", fixtures::new_review(h.customer, 5))
            .await
            .unwrap();
        assert!(!review.verified_purchase);

        let (product, _) = h.products.get("A-1").await.unwrap();
        assert_eq!(product.ratings.count, 1);
        assert_eq!(product.ratings.average, 5.0);

        let patch = ReviewPatch {
            rating: Some(3),
            ..Default::default()
        };
        h.service.update("A-1", review.id, patch).await.unwrap();
        assert_eq!(h.products.get("A-1").await.unwrap().0.ratings.average, 3.0);

        h.service.delete("A-1", review.id).await.unwrap();
        assert_eq!(h.products.get("A-1").await.unwrap().0.ratings.count, 0);
    }

    #[tokio::test]
    async fn test_second_review_conflicts() {
        let h = harness().await;
        h.service
            .create("A-1", fixtures::new_review(h.customer, 4))
            .await
            .unwrap();

        let again = h.service.create("A-1", fixtures::new_review(h.customer, 1)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_product_or_customer() {
        let h = harness().await;
        assert!(matches!(
            h.service.create("NOPE-1", fixtures::new_review(h.customer, 4)).await,
            Err(AppError::NotFound(_))
        ));
        let err = h
            .service
            .create("A-1", fixtures::new_review(Uuid::new_v4(), 4))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Customer not found");
    }

    #[tokio::test]
    async fn test_cited_order_must_match() {
        let h = harness().await;
        let mut order = order_fixtures::order(20.0, 1);
        order.customer_id = h.customer;
        order.items = vec![OrderItem::from_product(&product_fixtures::product("A-1", 20.0), 1)];
        let number = order.order_number.clone();
        h.orders.insert_many(vec![order]).await.unwrap();

        let mut wrong_product = fixtures::new_review(h.customer, 4);
        wrong_product.order_number = Some(number.clone());
        match h.service.create("B-1", wrong_product).await {
            Err(AppError::Validation { errors, .. }) => assert_eq!(errors[0].code, "product_not_in_order"),
            other => panic!("expected validation error, got {:?}", other),
        }

        let mut unknown = fixtures::new_review(h.customer, 4);
        unknown.order_number = Some("ORD-MISSING".to_string());
        match h.service.create("A-1", unknown).await {
            Err(AppError::Validation { errors, .. }) => assert_eq!(errors[0].code, "invalid_order"),
            other => panic!("expected validation error, got {:?}", other),
        }

        let mut cited = fixtures::new_review(h.customer, 4);
        cited.order_number = Some(number);
        assert!(h.service.create("A-1", cited).await.unwrap().verified_purchase);
    }

    #[tokio::test]
    async fn test_update_scoped_to_product() {
        let h = harness().await;
        let review = h
            .service
            .create("A-1", fixtures::new_review(h.customer, 4))
            .await
            .unwrap();

        let patch = ReviewPatch {
            title: Some("Changed my mind".to_string()),
            ..Default::default()
        };
        let err = h.service.update("B-1", review.id, patch).await.unwrap_err();
        assert_eq!(err.to_string(), "Review not found");
        assert!(matches!(
            h.service.update("A-1", review.id, ReviewPatch::default()).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_by_customer_requires_customer() {
        let h = harness().await;
        h.service
            .create("A-1", fixtures::new_review(h.customer, 4))
            .await
            .unwrap();
        assert_eq!(h.service.list_for_customer(h.customer).await.unwrap().len(), 1);
        assert_eq!(h.service.list_for_product("A-1").await.unwrap().len(), 1);
        assert!(matches!(
            h.service.list_for_customer(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
