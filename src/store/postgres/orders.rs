//! Orders table keyed by order number.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStore;
use crate::error::StoreError;
use crate::models::{Order, OrderPatch};
use crate::store::orders::order_not_found;
use crate::store::OrderStore;

fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
    let Json(order): Json<Order> = row.try_get("doc")?;
    Ok(order)
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_many(&self, orders: Vec<Order>) -> Result<Vec<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;

        for order in &orders {
            sqlx::query(
                r#"
                INSERT INTO orders (order_number, customer_id, doc, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&order.order_number)
            .bind(order.customer_id)
            .bind(Json(order))
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(orders)
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Order, StoreError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_order(&row),
            None => Err(order_not_found(order_number)),
        }
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM orders ORDER BY created_at DESC, order_number DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, order_number DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn update_fields(&self, order_number: &str, patch: &OrderPatch) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1 FOR UPDATE")
            .bind(order_number)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| order_not_found(order_number))?;

        let mut order = row_to_order(&row)?;
        patch.apply_to(&mut order)?;

        sqlx::query("UPDATE orders SET doc = $2, updated_at = $3 WHERE order_number = $1")
            .bind(order_number)
            .bind(Json(&order))
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn delete_by_number(&self, order_number: &str) -> Result<Order, StoreError> {
        let row = sqlx::query("DELETE FROM orders WHERE order_number = $1 RETURNING doc")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_order(&row),
            None => Err(order_not_found(order_number)),
        }
    }
}
