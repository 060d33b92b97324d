//! Products table: JSONB documents keyed by SKU.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;

use super::{like_pattern, PostgresStore};
use crate::error::StoreError;
use crate::models::{Product, ProductPatch, Ratings};
use crate::store::{distinct_categories, ProductStore};

fn not_found(sku: &str) -> StoreError {
    StoreError::NotFound(format!("product with SKU '{}'", sku))
}

fn row_to_product(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let Json(product): Json<Product> = row.try_get("doc")?;
    Ok(product)
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn find_by_sku(&self, sku: &str) -> Result<Product, StoreError> {
        let row = sqlx::query("SELECT doc FROM products WHERE sku = $1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(not_found(sku)),
        }
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM products ORDER BY created_at, sku")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, StoreError> {
        let mut tx = self.pool.begin().await?;

        for product in &products {
            sqlx::query(
                r#"
                INSERT INTO products (sku, doc, created_at, updated_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&product.sku)
            .bind(Json(product))
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(products)
    }

    async fn update_fields(&self, sku: &str, patch: &ProductPatch) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM products WHERE sku = $1 FOR UPDATE")
            .bind(sku)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found(sku))?;

        let mut product = row_to_product(&row)?;
        patch.apply_to(&mut product);

        sqlx::query("UPDATE products SET doc = $2, updated_at = $3 WHERE sku = $1")
            .bind(sku)
            .bind(Json(&product))
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn delete_by_sku(&self, sku: &str) -> Result<Product, StoreError> {
        let row = sqlx::query("DELETE FROM products WHERE sku = $1 RETURNING doc")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(not_found(sku)),
        }
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT doc->>'category' AS category FROM products ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        let categories = rows
            .iter()
            .map(|row| row.try_get::<String, _>("category"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(distinct_categories(categories.iter().map(String::as_str)))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM products
            WHERE doc->>'name' ILIKE $1
               OR doc->>'description' ILIKE $1
               OR doc->>'brand' ILIKE $1
               OR doc->>'category' ILIKE $1
               OR EXISTS (
                   SELECT 1 FROM jsonb_array_elements_text(doc->'tags') AS tag
                   WHERE tag ILIKE $1
               )
            ORDER BY created_at, sku
            LIMIT $2
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn set_ratings(&self, sku: &str, ratings: Ratings) -> Result<Product, StoreError> {
        let row = sqlx::query(
            "UPDATE products SET doc = jsonb_set(doc, '{ratings}', $2) WHERE sku = $1 RETURNING doc",
        )
        .bind(sku)
        .bind(Json(&ratings))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(not_found(sku)),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
