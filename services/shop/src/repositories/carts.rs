//! Cart repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Cart, CartItem};
use crate::repositories::products::{PRODUCT_COLUMNS, product_from_row};

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The account's cart, created empty on first access
    async fn get(&self, account_id: Uuid) -> ApiResult<Cart>;

    /// Read-only view of a cart; empty when the account has none
    async fn find(&self, account_id: Uuid) -> ApiResult<Cart>;

    /// Add `quantity` of a product, summing with an existing line.
    /// A sum past `i32::MAX` is a validation error.
    async fn add_item(&self, account_id: Uuid, product_id: Uuid, quantity: i32)
    -> ApiResult<Cart>;

    /// Set a line's quantity; the cart and the line must exist
    async fn update_item(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> ApiResult<Cart>;

    /// Drop a line if present; the cart must exist
    async fn remove_item(&self, account_id: Uuid, product_id: Uuid) -> ApiResult<Cart>;

    /// Empty the cart; an account without a cart gets an empty one back
    async fn clear(&self, account_id: Uuid) -> ApiResult<Cart>;

    /// Every cart, oldest first, including empty ones
    async fn list_all(&self) -> ApiResult<Vec<Cart>>;
}

fn cart_item_from_row(row: &PgRow) -> Result<(Uuid, CartItem), sqlx::Error> {
    Ok((
        row.try_get("account_id")?,
        CartItem {
            product: product_from_row(row)?,
            quantity: row.try_get("quantity")?,
        },
    ))
}

/// PostgreSQL-backed cart repository
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn cart_exists(&self, account_id: Uuid) -> ApiResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM carts WHERE account_id = $1)")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Cart lines joined with current product state
    async fn load(&self, account_id: Uuid) -> ApiResult<Cart> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT ci.account_id, ci.quantity, {PRODUCT_COLUMNS}
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.account_id = $1
            ORDER BY ci.id
            "#
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(|row| cart_item_from_row(row).map(|(_, item)| item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Cart { account_id, items })
    }

    async fn touch(&self, account_id: Uuid) -> ApiResult<()> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn get(&self, account_id: Uuid) -> ApiResult<Cart> {
        sqlx::query("INSERT INTO carts (account_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        self.load(account_id).await
    }

    async fn find(&self, account_id: Uuid) -> ApiResult<Cart> {
        self.load(account_id).await
    }

    async fn add_item(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> ApiResult<Cart> {
        let product_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        if !product_exists {
            return Err(ApiError::NotFound("Product"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO carts (account_id) VALUES ($1) \
             ON CONFLICT (account_id) DO UPDATE SET updated_at = NOW()",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO cart_items (account_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity
            "#,
        )
        .bind(account_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                return Err(ApiError::Validation("Quantity is too large".to_string()));
            }
            Ok(_) => {}
            // Product deleted between the existence check and the insert
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                return Err(ApiError::NotFound("Product"));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        debug!(account_id = %account_id, product_id = %product_id, quantity, "Cart item added");

        self.load(account_id).await
    }

    async fn update_item(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> ApiResult<Cart> {
        if !self.cart_exists(account_id).await? {
            return Err(ApiError::NotFound("Cart"));
        }

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE account_id = $1 AND product_id = $2",
        )
        .bind(account_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Cart item"));
        }
        self.touch(account_id).await?;

        self.load(account_id).await
    }

    async fn remove_item(&self, account_id: Uuid, product_id: Uuid) -> ApiResult<Cart> {
        if !self.cart_exists(account_id).await? {
            return Err(ApiError::NotFound("Cart"));
        }

        sqlx::query("DELETE FROM cart_items WHERE account_id = $1 AND product_id = $2")
            .bind(account_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        self.touch(account_id).await?;

        self.load(account_id).await
    }

    async fn clear(&self, account_id: Uuid) -> ApiResult<Cart> {
        let result = sqlx::query("DELETE FROM cart_items WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        self.touch(account_id).await?;

        info!(
            account_id = %account_id,
            removed = result.rows_affected(),
            "Cart cleared"
        );
        Ok(Cart::empty(account_id))
    }

    async fn list_all(&self) -> ApiResult<Vec<Cart>> {
        let owners: Vec<Uuid> =
            sqlx::query_scalar("SELECT account_id FROM carts ORDER BY created_at, account_id")
                .fetch_all(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT ci.account_id, ci.quantity, {PRODUCT_COLUMNS}
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            ORDER BY ci.id
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<CartItem>> = HashMap::new();
        for row in &rows {
            let (account_id, item) = cart_item_from_row(row)?;
            lines.entry(account_id).or_default().push(item);
        }

        Ok(owners
            .into_iter()
            .map(|account_id| Cart {
                account_id,
                items: lines.remove(&account_id).unwrap_or_default(),
            })
            .collect())
    }
}
