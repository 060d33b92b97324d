//! Customer profile storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Address, Customer, CustomerPatch};

// == Customer Store Trait ==
/// Email addresses are unique. Every edit runs against the stored document
/// under a row lock, so address book rules hold under concurrent requests.
#[async_trait]
pub trait CustomerStore: Send + Sync + fmt::Debug {
    /// Fails with `Duplicate` when the email is already registered.
    async fn insert(&self, customer: Customer) -> Result<Customer, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Customer, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Customer, StoreError>;

    /// All customers, oldest first.
    async fn list(&self) -> Result<Vec<Customer>, StoreError>;

    async fn update_fields(&self, id: Uuid, patch: &CustomerPatch) -> Result<Customer, StoreError>;

    async fn add_address(&self, id: Uuid, address: Address) -> Result<Customer, StoreError>;

    async fn update_address(&self, id: Uuid, index: usize, address: Address) -> Result<Customer, StoreError>;

    /// Fails with `StoreError::Address` for an unknown index or the last address.
    async fn remove_address(&self, id: Uuid, index: usize) -> Result<Customer, StoreError>;

    /// Adds a placed order to the customer's running totals.
    async fn record_order(&self, id: Uuid, amount: f64, at: DateTime<Utc>) -> Result<Customer, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Customer, StoreError>;
}

pub type SharedCustomerStore = Arc<dyn CustomerStore>;

pub(crate) fn customer_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("customer '{}'", id))
}

// == In-Memory Customer Store ==
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<HashMap<Uuid, Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: Uuid, edit: F) -> Result<Customer, StoreError>
    where
        F: FnOnce(&mut Customer) -> Result<(), StoreError> + Send,
    {
        let mut customers = self.customers.write().await;
        let stored = customers.get_mut(&id).ok_or_else(|| customer_not_found(id))?;

        // Edit a copy so a rejected edit leaves the stored document untouched
        let mut customer = stored.clone();
        edit(&mut customer)?;
        *stored = customer.clone();
        Ok(customer)
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn insert(&self, customer: Customer) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write().await;
        if customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::Duplicate(format!("email '{}'", customer.email)));
        }
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Customer, StoreError> {
        self.customers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| customer_not_found(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Customer, StoreError> {
        self.customers
            .read()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("customer with email '{}'", email)))
    }

    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let mut customers: Vec<Customer> = self.customers.read().await.values().cloned().collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(customers)
    }

    async fn update_fields(&self, id: Uuid, patch: &CustomerPatch) -> Result<Customer, StoreError> {
        self.modify(id, |customer| {
            patch.apply_to(customer);
            Ok(())
        })
        .await
    }

    async fn add_address(&self, id: Uuid, address: Address) -> Result<Customer, StoreError> {
        self.modify(id, |customer| {
            customer.add_address(address);
            Ok(())
        })
        .await
    }

    async fn update_address(&self, id: Uuid, index: usize, address: Address) -> Result<Customer, StoreError> {
        self.modify(id, |customer| Ok(customer.update_address(index, address)?))
            .await
    }

    async fn remove_address(&self, id: Uuid, index: usize) -> Result<Customer, StoreError> {
        self.modify(id, |customer| {
            customer.remove_address(index)?;
            Ok(())
        })
        .await
    }

    async fn record_order(&self, id: Uuid, amount: f64, at: DateTime<Utc>) -> Result<Customer, StoreError> {
        self.modify(id, |customer| {
            customer.record_order(amount, at);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<Customer, StoreError> {
        self.customers
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| customer_not_found(id))
    }
}
