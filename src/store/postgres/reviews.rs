//! Reviews table; `UNIQUE (product_sku, customer_id)` enforces one review per customer and product.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStore;
use crate::error::StoreError;
use crate::models::{Review, ReviewPatch};
use crate::store::reviews::review_not_found;
use crate::store::ReviewStore;

fn row_to_review(row: &sqlx::postgres::PgRow) -> Result<Review, StoreError> {
    let Json(review): Json<Review> = row.try_get("doc")?;
    Ok(review)
}

#[async_trait]
impl ReviewStore for PostgresStore {
    async fn insert(&self, review: Review) -> Result<Review, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_sku, customer_id, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(review.id)
        .bind(&review.product_sku)
        .bind(review.customer_id)
        .bind(Json(&review))
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(review)
    }

    async fn list_by_product(&self, sku: &str) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM reviews WHERE product_sku = $1 ORDER BY created_at, id")
            .bind(sku)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_review).collect()
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM reviews WHERE customer_id = $1 ORDER BY created_at, id")
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_review).collect()
    }

    async fn update_fields(&self, sku: &str, id: Uuid, patch: &ReviewPatch) -> Result<Review, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM reviews WHERE id = $1 AND product_sku = $2 FOR UPDATE")
            .bind(id)
            .bind(sku)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| review_not_found(sku, id))?;

        let mut review = row_to_review(&row)?;
        patch.apply_to(&mut review);

        sqlx::query("UPDATE reviews SET doc = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&review))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(review)
    }

    async fn delete(&self, sku: &str, id: Uuid) -> Result<Review, StoreError> {
        let row = sqlx::query("DELETE FROM reviews WHERE id = $1 AND product_sku = $2 RETURNING doc")
            .bind(id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_review(&row),
            None => Err(review_not_found(sku, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::fixtures;
    use crate::store::postgres::live_store;

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_postgres_review_round_trip() {
        let store = live_store().await;
        let customer = Uuid::new_v4();
        let sku = format!("PG-REV-{}", Uuid::new_v4().simple());
        let review = store
            .insert(fixtures::new_review(customer, 4).into_review(&sku, false))
            .await
            .unwrap();

        assert!(matches!(
            store.insert(fixtures::new_review(customer, 2).into_review(&sku, false)).await,
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            store.delete("OTHER-SKU", review.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.delete(&sku, review.id).await.unwrap().id, review.id);
    }
}
