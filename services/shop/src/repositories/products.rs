//! Product repository for database operations

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{NewProduct, Product, UpdateProduct};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Whole catalog, oldest first
    async fn list(&self) -> ApiResult<Vec<Product>>;

    /// `None` when no product has this id
    async fn find(&self, id: Uuid) -> ApiResult<Option<Product>>;

    /// Insert a product whose price has already been validated
    async fn create(&self, product: &NewProduct, price: Decimal) -> ApiResult<Product>;

    /// Apply the fields present in `update` and bump `updated_at`.
    /// Fails with `NotFound` for an unknown id.
    async fn update(&self, id: Uuid, update: &UpdateProduct) -> ApiResult<Product>;

    /// Hard delete; cart lines referencing the product go with it
    async fn delete(&self, id: Uuid) -> ApiResult<()>;
}

pub(crate) const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.description, p.price, p.image_url, p.created_at, p.updated_at";

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL-backed product repository
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self) -> ApiResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p ORDER BY p.created_at, p.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(product_from_row).transpose()?)
    }

    async fn create(&self, product: &NewProduct, price: Decimal) -> ApiResult<Product> {
        info!("Creating product: {}", product.name);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products AS p (id, name, description, price, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(price)
        .bind(&product.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(product_from_row(&row)?)
    }

    async fn update(&self, id: Uuid, update: &UpdateProduct) -> ApiResult<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products AS p
            SET name = COALESCE($2, p.name),
                description = COALESCE($3, p.description),
                price = COALESCE($4, p.price),
                image_url = COALESCE($5, p.image_url),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.image_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                info!(product_id = %id, "Product updated");
                Ok(product_from_row(&row)?)
            }
            None => Err(ApiError::NotFound("Product")),
        }
    }

    async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Product"));
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
