//! Order Service
//!
//! Places orders against the live catalog and the customer registry, and
//! drives order updates through the status lifecycle.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::catalog::{ProductService, DEFAULT_OPERATION_TIMEOUT};
use crate::error::{AppError, Result, StoreError};
use crate::models::order::{validate_order_number, OrderItem};
use crate::models::{
    BulkOrderDeleteItem, BulkOrderUpdateItem, BulkResponse, FieldError, NewOrder, Order,
    OrderPatch, ProductStatus,
};
use crate::store::{self, SharedCustomerStore, SharedOrderStore};

const ENTITY: &str = "Order";

#[derive(Debug, Clone)]
pub struct OrderService {
    orders: SharedOrderStore,
    customers: SharedCustomerStore,
    products: ProductService,
    deadline: Duration,
}

fn check_order_number(order_number: &str) -> Result<()> {
    match validate_order_number(order_number) {
        Some(error) => Err(AppError::Validation {
            message: error.message.clone(),
            errors: vec![error],
        }),
        None => Ok(()),
    }
}

/// Re-homes a field error under a bulk item prefix such as `[2].`.
fn prefixed(prefix: &str, error: FieldError) -> FieldError {
    FieldError {
        field: format!("{}{}", prefix, error.field),
        ..error
    }
}

impl OrderService {
    pub fn new(orders: SharedOrderStore, customers: SharedCustomerStore, products: ProductService) -> Self {
        Self {
            orders,
            customers,
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

    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.bounded(self.orders.list()).await?)
    }

    pub async fn get(&self, order_number: &str) -> Result<Order> {
        check_order_number(order_number)?;
        self.bounded(self.orders.find_by_number(order_number))
            .await
            .map_err(|e| AppError::store(ENTITY, e))
    }

    // == Place ==
    /// Resolves one request into an order: the customer must exist under the
    /// given email and ID, and every SKU must be an active product.
    async fn prepare(&self, request: NewOrder, prefix: &str) -> std::result::Result<Order, Vec<FieldError>> {
        let errors = request.validate(prefix);
        if !errors.is_empty() {
            return Err(errors);
        }

        let email = request.customer_email.trim().to_lowercase();
        let customer = match self.bounded(self.customers.find_by_email(&email)).await {
            Ok(customer) => customer,
            Err(StoreError::NotFound(_)) => {
                return Err(vec![FieldError::new(
                    format!("{}customer_email", prefix),
                    format!("Customer with email '{}' not found", email),
                    "customer_not_found",
                )])
            }
            Err(e) => {
                error!(error = %e, "customer lookup failed");
                return Err(vec![FieldError::new(
                    format!("{}customer_email", prefix),
                    "Database error occurred",
                    "database_error",
                )]);
            }
        };
        if customer.id != request.customer_id {
            return Err(vec![FieldError::new(
                format!("{}customer_id", prefix),
                format!("Customer ID does not match email '{}'", email),
                "customer_mismatch",
            )]);
        }

        let mut items = Vec::with_capacity(request.items.len());
        let mut errors = Vec::new();
        for (j, line) in request.items.iter().enumerate() {
            let field = format!("{}items[{}].sku", prefix, j);
            match self.products.get(&line.sku).await {
                Ok((product, _)) if product.status == ProductStatus::Active => {
                    items.push(OrderItem::from_product(&product, line.quantity));
                }
                Ok(_) => errors.push(FieldError::new(
                    field,
                    format!("Product {} is not available", line.sku),
                    "product_unavailable",
                )),
                Err(AppError::NotFound(_)) | Err(AppError::Validation { .. }) => {
                    errors.push(FieldError::new(
                        field,
                        format!("No product exists with SKU {}", line.sku),
                        "product_not_found",
                    ))
                }
                Err(e) => {
                    error!(sku = %line.sku, error = %e, "product lookup failed");
                    errors.push(FieldError::new(field, "Database error occurred", "database_error"));
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(request.into_order(items, customer.email, Utc::now()))
    }

    /// Places each order independently. Customer statistics are updated after
    /// the order is stored; a failed statistics update is logged, not reported.
    pub async fn create_many(&self, requests: Vec<NewOrder>) -> Result<BulkResponse<Order>> {
        if requests.is_empty() {
            return Err(AppError::validation(
                "orders",
                "At least one order is required",
                "empty_array",
            ));
        }

        let total = requests.len();
        let mut created = Vec::new();
        let mut errors = Vec::new();

        for (i, request) in requests.into_iter().enumerate() {
            let prefix = format!("[{}].", i);
            let order = match self.prepare(request, &prefix).await {
                Ok(order) => order,
                Err(item_errors) => {
                    errors.extend(item_errors);
                    continue;
                }
            };

            match self.bounded(self.orders.insert_many(vec![order])).await {
                Ok(mut stored) => {
                    let Some(order) = stored.pop() else { continue };
                    if let Err(e) = self
                        .bounded(self.customers.record_order(
                            order.customer_id,
                            order.totals.grand_total,
                            order.created_at,
                        ))
                        .await
                    {
                        warn!(order_number = %order.order_number, error = %e, "customer statistics not updated");
                    }
                    info!(order_number = %order.order_number, total = order.totals.grand_total, "order placed");
                    created.push(order);
                }
                Err(e) => {
                    error!(error = %e, "order insert failed");
                    errors.push(FieldError::new(
                        format!("[{}]", i),
                        "Failed to create order",
                        "create_failed",
                    ));
                }
            }
        }

        if !errors.is_empty() {
            warn!(failed = errors.len(), total, "bulk order create partially failed");
        }
        Ok(BulkResponse::new(created, errors, total))
    }

    // == Update ==
    pub async fn update(&self, order_number: &str, patch: OrderPatch) -> Result<Order> {
        check_order_number(order_number)?;
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

        let updated = self
            .bounded(self.orders.update_fields(order_number, &patch))
            .await
            .map_err(|e| AppError::store(ENTITY, e))?;
        info!(order_number, status = updated.status.as_str(), "order updated");
        Ok(updated)
    }

    pub async fn delete(&self, order_number: &str) -> Result<Order> {
        check_order_number(order_number)?;
        let deleted = self
            .bounded(self.orders.delete_by_number(order_number))
            .await
            .map_err(|e| AppError::store(ENTITY, e))?;
        info!(order_number, "order deleted");
        Ok(deleted)
    }

    // == Bulk Update ==
    pub async fn bulk_update(&self, items: Vec<BulkOrderUpdateItem>) -> Result<BulkResponse<Order>> {
        if items.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one order update",
                "empty_updates",
            ));
        }

        let total = items.len();
        let mut updated = Vec::new();
        let mut errors = Vec::new();

        for (i, BulkOrderUpdateItem { order_number, patch }) in items.into_iter().enumerate() {
            let prefix = format!("[{}].", i);
            if let Some(error) = validate_order_number(&order_number) {
                errors.push(prefixed(&prefix, error));
                continue;
            }
            if patch.is_empty() {
                errors.push(FieldError::new(
                    format!("[{}]", i),
                    format!("No valid fields to update for order {}", order_number),
                    "no_valid_updates",
                ));
                continue;
            }
            let invalid = patch.validate(&prefix);
            if !invalid.is_empty() {
                errors.extend(invalid);
                continue;
            }

            match self.bounded(self.orders.update_fields(&order_number, &patch)).await {
                Ok(order) => updated.push(order),
                Err(StoreError::NotFound(_)) => errors.push(FieldError::new(
                    format!("{}order_number", prefix),
                    format!("No order exists with number {}", order_number),
                    "not_found",
                )),
                Err(StoreError::Transition(e)) => errors.push(FieldError::new(
                    format!("{}status", prefix),
                    e.to_string(),
                    "invalid_status_transition",
                )),
                Err(e) => {
                    error!(order_number = %order_number, error = %e, "bulk order update failed");
                    errors.push(FieldError::new(
                        format!("{}order_number", prefix),
                        format!("Failed to update order {}", order_number),
                        "update_failed",
                    ));
                }
            }
        }

        Ok(BulkResponse::new(updated, errors, total))
    }

    // == Bulk Delete ==
    pub async fn bulk_delete(&self, items: Vec<BulkOrderDeleteItem>) -> Result<BulkResponse<String>> {
        if items.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one order number to delete",
                "empty_array",
            ));
        }

        let total = items.len();
        let mut deleted = Vec::new();
        let mut errors = Vec::new();

        for (i, BulkOrderDeleteItem { order_number }) in items.into_iter().enumerate() {
            let prefix = format!("[{}].", i);
            if let Some(error) = validate_order_number(&order_number) {
                errors.push(prefixed(&prefix, error));
                continue;
            }

            match self.bounded(self.orders.delete_by_number(&order_number)).await {
                Ok(order) => deleted.push(order.order_number),
                Err(StoreError::NotFound(_)) => errors.push(FieldError::new(
                    format!("{}order_number", prefix),
                    format!("No order exists with number {}", order_number),
                    "not_found",
                )),
                Err(e) => {
                    error!(order_number = %order_number, error = %e, "bulk order delete failed");
                    errors.push(FieldError::new(
                        format!("{}order_number", prefix),
                        "Database error occurred",
                        "database_error",
                    ));
                }
            }
        }

        Ok(BulkResponse::new(deleted, errors, total))
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
    use crate::models::{Customer, OrderStatus};
    use crate::store::{
        CustomerStore, InMemoryCustomerStore, InMemoryOrderStore, InMemoryProductStore, ProductStore,
    };

    struct Harness {
        service: OrderService,
        customers: Arc<InMemoryCustomerStore>,
        customer: Customer,
    }

    async fn harness() -> Harness {
        let products = Arc::new(InMemoryProductStore::new());
        let mut retired = product_fixtures::product("OLD-1", 5.0);
        retired.status = ProductStatus::Inactive;
        products
            .insert_many(vec![
                product_fixtures::product("A-1", 20.0),
                product_fixtures::product("B-1", 45.0),
                retired,
            ])
            .await
            .unwrap();
        let catalog = ProductService::new(products, CatalogCache::new(Arc::new(MemoryCache::new(1000))));

        let customers = Arc::new(InMemoryCustomerStore::new());
        let customer = customers
            .insert(customer_fixtures::customer("ada@example.com"))
            .await
            .unwrap();

        let service = OrderService::new(Arc::new(InMemoryOrderStore::new()), customers.clone(), catalog);
        Harness {
            service,
            customers,
            customer,
        }
    }

    #[tokio::test]
    async fn test_place_order_snapshots_catalog_prices() {
        let h = harness().await;
        let request = order_fixtures::new_order(h.customer.id, "ada@example.com", &[("A-1", 2), ("B-1", 1)]);

        let result = h.service.create_many(vec![request]).await.unwrap();
        assert_eq!(result.success_count, 1);

        let order = &result.items[0];
        assert_eq!(order.items[0].unit_price, 20.0);
        assert_eq!(order.totals.subtotal, 85.0);
        assert_eq!(order.totals.shipping, 15.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));

        let customer = h.customers.find_by_id(h.customer.id).await.unwrap();
        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.total_spent, order.totals.grand_total);
    }

    #[tokio::test]
    async fn test_partial_success_reports_each_failure() {
        let h = harness().await;
        let requests = vec![
            order_fixtures::new_order(h.customer.id, "ada@example.com", &[("A-1", 1)]),
            order_fixtures::new_order(h.customer.id, "nobody@example.com", &[("A-1", 1)]),
            order_fixtures::new_order(uuid::Uuid::new_v4(), "ada@example.com", &[("A-1", 1)]),
            order_fixtures::new_order(h.customer.id, "ada@example.com", &[("NOPE-1", 1)]),
            order_fixtures::new_order(h.customer.id, "ada@example.com", &[("OLD-1", 1)]),
        ];

        let result = h.service.create_many(requests).await.unwrap();
        assert_eq!(result.success_count, 1);
        let codes: Vec<(&str, &str)> = result
            .errors
            .iter()
            .map(|e| (e.field.as_str(), e.code.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("[1].customer_email", "customer_not_found"),
                ("[2].customer_id", "customer_mismatch"),
                ("[3].items[0].sku", "product_not_found"),
                ("[4].items[0].sku", "product_unavailable"),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_follows_lifecycle() {
        let h = harness().await;
        let request = order_fixtures::new_order(h.customer.id, "ada@example.com", &[("A-1", 1)]);
        let placed = h.service.create_many(vec![request]).await.unwrap().items.remove(0);

        let ship = OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..Default::default()
        };
        match h.service.update(&placed.order_number, ship.clone()).await {
            Err(AppError::Validation { errors, .. }) => {
                assert_eq!(errors[0].code, "invalid_status_transition")
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let process = OrderPatch {
            status: Some(OrderStatus::Processing),
            ..Default::default()
        };
        let processing = h.service.update(&placed.order_number, process).await.unwrap();
        assert!(processing.timeline.paid_at.is_some());

        let shipped = h.service.update(&placed.order_number, ship).await.unwrap();
        assert!(shipped.timeline.estimated_delivery.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_order_is_named() {
        let h = harness().await;
        let err = h.service.get("ORD-MISSING").await.unwrap_err();
        assert_eq!(err.to_string(), "Order not found");
        assert!(matches!(h.service.get("AB").await, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_bulk_update_and_delete_codes() {
        let h = harness().await;
        let request = order_fixtures::new_order(h.customer.id, "ada@example.com", &[("A-1", 1)]);
        let placed = h.service.create_many(vec![request]).await.unwrap().items.remove(0);
        let notes = OrderPatch {
            notes: Some("ring twice".to_string()),
            ..Default::default()
        };

        let updates = vec![
            BulkOrderUpdateItem {
                order_number: placed.order_number.clone(),
                patch: notes.clone(),
            },
            BulkOrderUpdateItem {
                order_number: String::new(),
                patch: notes.clone(),
            },
            BulkOrderUpdateItem {
                order_number: "AB".to_string(),
                patch: notes.clone(),
            },
            BulkOrderUpdateItem {
                order_number: placed.order_number.clone(),
                patch: OrderPatch::default(),
            },
            BulkOrderUpdateItem {
                order_number: "ORD-MISSING".to_string(),
                patch: notes,
            },
        ];
        let result = h.service.bulk_update(updates).await.unwrap();
        assert_eq!(result.success_count, 1);
        let codes: Vec<&str> = result.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "missing_order_number",
                "invalid_order_number_format",
                "no_valid_updates",
                "not_found"
            ]
        );
        assert_eq!(result.errors[0].field, "[1].order_number");

        let deletes = vec![
            BulkOrderDeleteItem {
                order_number: placed.order_number.clone(),
            },
            BulkOrderDeleteItem {
                order_number: placed.order_number.clone(),
            },
        ];
        let result = h.service.bulk_delete(deletes).await.unwrap();
        assert_eq!(result.items, vec![placed.order_number]);
        assert_eq!(result.errors[0].code, "not_found");
    }

    #[tokio::test]
    async fn test_empty_batches_rejected() {
        let h = harness().await;
        assert!(matches!(h.service.create_many(vec![]).await, Err(AppError::Validation { .. })));
        assert!(matches!(h.service.bulk_update(vec![]).await, Err(AppError::Validation { .. })));
        assert!(matches!(h.service.bulk_delete(vec![]).await, Err(AppError::Validation { .. })));
    }
}
