//! Customer Service
//!
//! Registration, profile and address book edits, and the paginated order
//! history of a customer.

use std::future::Future;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::catalog::DEFAULT_OPERATION_TIMEOUT;
use crate::commerce::password::hash_password;
use crate::error::{AppError, Result, StoreError};
use crate::models::{
    Address, Customer, CustomerOrders, CustomerPatch, FieldError, NewCustomer, OrderSummary,
    PageQuery, Pagination,
};
use crate::models::cart::round_cents;
use crate::store::{self, SharedCustomerStore, SharedOrderStore};

const ENTITY: &str = "Customer";

#[derive(Debug, Clone)]
pub struct CustomerService {
    customers: SharedCustomerStore,
    orders: SharedOrderStore,
    deadline: Duration,
}

fn invalid(message: &str, errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: message.to_string(),
            errors,
        })
    }
}

impl CustomerService {
    pub fn new(customers: SharedCustomerStore, orders: SharedOrderStore) -> Self {
        Self {
            customers,
            orders,
            deadline: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        store::with_deadline(self.deadline, fut)
            .await
            .map_err(|e| AppError::store(ENTITY, e))
    }

    // == Register ==
    /// Validates, hashes the password and stores the profile.
    pub async fn register(&self, request: NewCustomer) -> Result<Customer> {
        invalid("Invalid customer data", request.validate())?;

        let email = request.email.trim().to_lowercase();
        match store::with_deadline(self.deadline, self.customers.find_by_email(&email)).await {
            Ok(_) => return Err(duplicate_email()),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(AppError::from(e)),
        }

        let password_hash = hash_password(request.password.clone()).await?;
        let customer = request.into_customer(password_hash);

        // The unique email constraint still decides concurrent registrations
        let created = match store::with_deadline(self.deadline, self.customers.insert(customer)).await {
            Err(StoreError::Duplicate(_)) => return Err(duplicate_email()),
            other => other.map_err(AppError::from)?,
        };
        info!(customer_id = %created.id, "customer registered");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Customer> {
        self.bounded(self.customers.find_by_id(id)).await
    }

    pub async fn list(&self) -> Result<Vec<Customer>> {
        self.bounded(self.customers.list()).await
    }

    // == Update ==
    pub async fn update(&self, id: Uuid, patch: CustomerPatch) -> Result<Customer> {
        if patch.is_empty() {
            return Err(AppError::validation(
                "body",
                "Request body must contain at least one mutable field",
                "no_valid_updates",
            ));
        }
        invalid("Invalid update", patch.validate())?;
        self.bounded(self.customers.update_fields(id, &patch)).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Customer> {
        let deleted = self.bounded(self.customers.delete(id)).await?;
        info!(customer_id = %id, "customer deleted");
        Ok(deleted)
    }

    // == Addresses ==
    pub async fn add_address(&self, id: Uuid, address: Address) -> Result<Customer> {
        invalid("Invalid address", address.validate(""))?;
        self.bounded(self.customers.add_address(id, address)).await
    }

    pub async fn update_address(&self, id: Uuid, index: usize, address: Address) -> Result<Customer> {
        invalid("Invalid address", address.validate(""))?;
        self.bounded(self.customers.update_address(id, index, address)).await
    }

    pub async fn remove_address(&self, id: Uuid, index: usize) -> Result<Customer> {
        self.bounded(self.customers.remove_address(id, index)).await
    }

    // == Order History ==
    /// One page of the customer's orders, newest first. The summary covers every order.
    pub async fn orders(&self, id: Uuid, page: PageQuery) -> Result<CustomerOrders> {
        if let Some(error) = page.validate() {
            return Err(AppError::Validation {
                message: "Invalid pagination".to_string(),
                errors: vec![error],
            });
        }
        self.get(id).await?;

        let orders = self.bounded(self.orders.list_by_customer(id)).await?;
        let summary = OrderSummary {
            total_orders: orders.len(),
            total_spent: round_cents(orders.iter().map(|o| o.totals.grand_total).sum()),
        };
        let pagination = Pagination::new(page.page, page.limit, orders.len());
        let range = pagination.range();
        let orders = orders.into_iter().skip(range.start).take(range.len()).collect();

        Ok(CustomerOrders {
            orders,
            summary,
            pagination,
        })
    }
}

fn duplicate_email() -> AppError {
    AppError::Conflict("Email already registered".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::commerce::password::verify_password;
    use crate::models::customer::fixtures;
    use crate::models::order;
    use crate::store::{InMemoryCustomerStore, InMemoryOrderStore, OrderStore};

    fn service() -> (CustomerService, Arc<InMemoryOrderStore>) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let service = CustomerService::new(Arc::new(InMemoryCustomerStore::new()), orders.clone());
        (service, orders)
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (service, _) = service();
        let customer = service
            .register(fixtures::new_customer("Ada@Example.com"))
            .await
            .unwrap();

        assert_eq!(customer.email, "ada@example.com");
        assert!(verify_password("correct horse", &customer.password_hash));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let (service, _) = service();
        service.register(fixtures::new_customer("ada@example.com")).await.unwrap();

        let err = service
            .register(fixtures::new_customer("ADA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email already registered"));
    }

    #[tokio::test]
    async fn test_register_validates_before_hashing() {
        let (service, _) = service();
        let mut request = fixtures::new_customer("ada@example.com");
        request.password = "short".to_string();
        assert!(matches!(
            service.register(request).await,
            Err(AppError::Validation { .. })
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_customer_is_named() {
        let (service, _) = service();
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.to_string(), "Customer not found");
    }

    #[tokio::test]
    async fn test_cannot_delete_last_address() {
        let (service, _) = service();
        let customer = service.register(fixtures::new_customer("ada@example.com")).await.unwrap();

        match service.remove_address(customer.id, 0).await {
            Err(AppError::Validation { errors, .. }) => assert_eq!(errors[0].code, "invalid_operation"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(matches!(
            service.update_address(customer.id, 3, fixtures::address("Ottawa")).await,
            Err(AppError::NotFound(ref m)) if m == "Address not found"
        ));
    }

    #[tokio::test]
    async fn test_order_history_pages_and_summary() {
        let (service, orders) = service();
        let customer = service.register(fixtures::new_customer("ada@example.com")).await.unwrap();

        let placed: Vec<_> = (0..3)
            .map(|i| {
                let mut o = order::fixtures::order(10.0, 1);
                o.customer_id = customer.id;
                o.order_number = format!("ORD-TEST-{}", i);
                o.created_at += chrono::Duration::seconds(i);
                o
            })
            .collect();
        orders.insert_many(placed).await.unwrap();

        let page = service
            .orders(customer.id, PageQuery { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.summary.total_orders, 3);
        assert_eq!(page.summary.total_spent, 78.9);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].order_number, "ORD-TEST-0");
    }

    #[tokio::test]
    async fn test_order_history_rejects_bad_page() {
        let (service, _) = service();
        let result = service.orders(Uuid::new_v4(), PageQuery { page: 0, limit: 10 }).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
