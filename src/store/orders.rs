//! Order storage keyed by order number.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Order, OrderPatch};

// == Order Store Trait ==
#[async_trait]
pub trait OrderStore: Send + Sync + fmt::Debug {
    /// Inserts the batch; an order number collision rejects the whole batch with `Duplicate`.
    async fn insert_many(&self, orders: Vec<Order>) -> Result<Vec<Order>, StoreError>;

    async fn find_by_number(&self, order_number: &str) -> Result<Order, StoreError>;

    /// All orders, newest first.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Orders of one customer, newest first.
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError>;

    /// Applies the patch to the stored order; an illegal status change fails with `Transition`.
    async fn update_fields(&self, order_number: &str, patch: &OrderPatch) -> Result<Order, StoreError>;

    async fn delete_by_number(&self, order_number: &str) -> Result<Order, StoreError>;
}

pub type SharedOrderStore = Arc<dyn OrderStore>;

pub(crate) fn order_not_found(order_number: &str) -> StoreError {
    StoreError::NotFound(format!("order '{}'", order_number))
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.order_number.cmp(&a.order_number))
    });
    orders
}

// == In-Memory Order Store ==
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_many(&self, orders: Vec<Order>) -> Result<Vec<Order>, StoreError> {
        let mut stored = self.orders.write().await;

        let mut batch = HashSet::new();
        for order in &orders {
            if stored.contains_key(&order.order_number) || !batch.insert(order.order_number.as_str()) {
                return Err(StoreError::Duplicate(format!("order number '{}'", order.order_number)));
            }
        }

        for order in &orders {
            stored.insert(order.order_number.clone(), order.clone());
        }
        Ok(orders)
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Order, StoreError> {
        self.orders
            .read()
            .await
            .get(order_number)
            .cloned()
            .ok_or_else(|| order_not_found(order_number))
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        Ok(newest_first(self.orders.read().await.values().cloned().collect()))
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let matching = orders
            .values()
            .filter(|order| order.customer_id == customer_id)
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }

    async fn update_fields(&self, order_number: &str, patch: &OrderPatch) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(order_number)
            .ok_or_else(|| order_not_found(order_number))?;

        let mut order = stored.clone();
        patch.apply_to(&mut order)?;
        *stored = order.clone();
        Ok(order)
    }

    async fn delete_by_number(&self, order_number: &str) -> Result<Order, StoreError> {
        self.orders
            .write()
            .await
            .remove(order_number)
            .ok_or_else(|| order_not_found(order_number))
    }
}
