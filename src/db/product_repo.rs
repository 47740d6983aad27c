use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{Product, ProductChanges, SyncStatus};

/// Fields for a product that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub image_url: Option<String>,
    pub owner: String,
}

pub struct ProductRepository {
    pool: SqlitePool,
}

// Row type for database queries
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: String,
    image_url: Option<String>,
    owner: String,
    remote_id: Option<i64>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl ProductRow {
    fn into_product(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            owner: self.owner,
            remote_id: self.remote_id,
            status: SyncStatus::parse(&self.status).unwrap_or(SyncStatus::SyncFailed),
            created_at: DateTime::parse_from_rfc3339(&self.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&self.updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new product row. New products always start as
    /// `local_only` with no remote id.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, image_url, owner, remote_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.price)
        .bind(&new.image_url)
        .bind(&new.owner)
        .bind(SyncStatus::LocalOnly.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_any(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Fetches a product by id, scoped to its owner.
    pub async fn get(&self, id: i64, owner: &str) -> Result<Option<Product>, sqlx::Error> {
        let row: Option<ProductRow> =
            sqlx::query_as("SELECT * FROM products WHERE id = ? AND owner = ?")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ProductRow::into_product))
    }

    /// Fetches a product by id regardless of owner. Used internally after
    /// writes keyed by primary key.
    async fn get_any(&self, id: i64) -> Result<Option<Product>, sqlx::Error> {
        let row: Option<ProductRow> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ProductRow::into_product))
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<Product>, sqlx::Error> {
        let rows: Vec<ProductRow> =
            sqlx::query_as("SELECT * FROM products WHERE owner = ? ORDER BY id")
                .bind(owner)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    /// Applies a partial update to the user-editable fields. Fields absent
    /// from `changes` keep their current value.
    pub async fn update_fields(
        &self,
        id: i64,
        changes: &ProductChanges,
    ) -> Result<Product, sqlx::Error> {
        let current = self.get_any(id).await?.ok_or(sqlx::Error::RowNotFound)?;

        let name = changes.name.as_ref().unwrap_or(&current.name);
        let description = changes.description.as_ref().or(current.description.as_ref());
        let price = changes.price.as_ref().unwrap_or(&current.price);
        let image_url = changes.image_url.as_ref().or(current.image_url.as_ref());
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_any(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Commits the outcome of a sync attempt: the new status and, when a
    /// remote create just succeeded, the newly assigned remote id. A `None`
    /// remote id leaves the stored value untouched. Single-row UPDATE, so
    /// the commit is atomic with respect to this product.
    pub async fn update_sync_state(
        &self,
        id: i64,
        status: SyncStatus,
        remote_id: Option<i64>,
    ) -> Result<Product, sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE products
            SET status = ?, remote_id = COALESCE(?, remote_id), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(remote_id)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_any(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
