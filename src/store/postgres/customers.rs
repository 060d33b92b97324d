//! Customers table. The password hash lives in its own column and never in the document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStore;
use crate::error::StoreError;
use crate::models::{Address, Customer, CustomerPatch};
use crate::store::customers::customer_not_found;
use crate::store::CustomerStore;

fn row_to_customer(row: &sqlx::postgres::PgRow) -> Result<Customer, StoreError> {
    let Json(mut customer): Json<Customer> = row.try_get("doc")?;
    customer.password_hash = row.try_get("password_hash")?;
    Ok(customer)
}

impl PostgresStore {
    /// Loads the customer row under `FOR UPDATE`, applies `edit` and writes it back.
    /// A failed edit rolls the transaction back.
    async fn modify_customer<F>(&self, id: Uuid, edit: F) -> Result<Customer, StoreError>
    where
        F: FnOnce(&mut Customer) -> Result<(), StoreError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc, password_hash FROM customers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| customer_not_found(id))?;

        let mut customer = row_to_customer(&row)?;
        edit(&mut customer)?;

        sqlx::query("UPDATE customers SET doc = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(Json(&customer))
            .bind(customer.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(customer)
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn insert(&self, customer: Customer) -> Result<Customer, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, email, password_hash, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(customer.id)
        .bind(&customer.email)
        .bind(&customer.password_hash)
        .bind(Json(&customer))
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Customer, StoreError> {
        let row = sqlx::query("SELECT doc, password_hash FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_customer(&row),
            None => Err(customer_not_found(id)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Customer, StoreError> {
        let row = sqlx::query("SELECT doc, password_hash FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_customer(&row),
            None => Err(StoreError::NotFound(format!("customer with email '{}'", email))),
        }
    }

    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query("SELECT doc, password_hash FROM customers ORDER BY created_at, email")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_customer).collect()
    }

    async fn update_fields(&self, id: Uuid, patch: &CustomerPatch) -> Result<Customer, StoreError> {
        self.modify_customer(id, |customer| {
            patch.apply_to(customer);
            Ok(())
        })
        .await
    }

    async fn add_address(&self, id: Uuid, address: Address) -> Result<Customer, StoreError> {
        self.modify_customer(id, |customer| {
            customer.add_address(address);
            Ok(())
        })
        .await
    }

    async fn update_address(&self, id: Uuid, index: usize, address: Address) -> Result<Customer, StoreError> {
        self.modify_customer(id, |customer| Ok(customer.update_address(index, address)?))
            .await
    }

    async fn remove_address(&self, id: Uuid, index: usize) -> Result<Customer, StoreError> {
        self.modify_customer(id, |customer| {
            customer.remove_address(index)?;
            Ok(())
        })
        .await
    }

    async fn record_order(&self, id: Uuid, amount: f64, at: DateTime<Utc>) -> Result<Customer, StoreError> {
        self.modify_customer(id, |customer| {
            customer.record_order(amount, at);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<Customer, StoreError> {
        let row = sqlx::query("DELETE FROM customers WHERE id = $1 RETURNING doc, password_hash")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_customer(&row),
            None => Err(customer_not_found(id)),
        }
    }
}
