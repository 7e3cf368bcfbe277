//! Order repository; checkout runs here as a single transaction

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use crate::checkout::{self, PricedLine};
use crate::error::{ApiError, ApiResult};
use crate::models::{AccountSummary, Order, OrderLine, OrderWithOwner, ShippingAddress};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Turn the account's cart into an order: price it at current catalog
    /// prices, debit the balance, store the order and empty the cart.
    /// Either every step happens or none does. Returns the order and the
    /// remaining balance.
    async fn place_order(
        &self,
        account_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> ApiResult<(Order, Decimal)>;

    /// Orders of one account, newest first
    async fn list_for_account(&self, account_id: Uuid) -> ApiResult<Vec<Order>>;

    /// Every order with its owner, newest first
    async fn list_all(&self) -> ApiResult<Vec<OrderWithOwner>>;
}

const ORDER_COLUMNS: &str =
    "o.id, o.account_id, o.total_amount, o.street, o.city, o.postal_code, o.created_at";

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        items: Vec::new(),
        total_amount: row.try_get("total_amount")?,
        shipping_address: ShippingAddress {
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn owner_from_row(row: &PgRow) -> Result<Option<AccountSummary>, sqlx::Error> {
    let id: Option<Uuid> = row.try_get("owner_id")?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(AccountSummary {
        id,
        username: row.try_get("owner_username")?,
        email: row.try_get("owner_email")?,
    }))
}

/// PostgreSQL-backed order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fill in the lines of already loaded orders
    async fn attach_lines(&self, orders: &mut [Order]) -> ApiResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines.entry(order_id).or_default().push(OrderLine {
                product_id: row.try_get("product_id")?,
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
            });
        }

        for order in orders.iter_mut() {
            order.items = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, total_amount, street, city, postal_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id)
        .bind(order.account_id)
        .bind(order.total_amount)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.postal_code)
        .bind(order.created_at)
        .execute(&mut **tx)
        .await?;

        for line in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn place_order(
        &self,
        account_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> ApiResult<(Order, Decimal)> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent checkouts of the same account
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        let balance = balance.ok_or(ApiError::NotFound("User"))?;

        let rows = sqlx::query(
            r#"
            SELECT ci.product_id, p.name, p.price, ci.quantity
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.account_id = $1
            ORDER BY ci.id
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await?;

        let lines = rows
            .iter()
            .map(|row| -> Result<PricedLine, sqlx::Error> {
                Ok(PricedLine {
                    product_id: row.try_get("product_id")?,
                    product_name: row.try_get("name")?,
                    unit_price: row.try_get("price")?,
                    quantity: row.try_get("quantity")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let quote = checkout::quote(lines)?;
        if let Err(e) = checkout::debit(balance, quote.total) {
            warn!(account_id = %account_id, %balance, total = %quote.total, "Checkout refused");
            return Err(e);
        }

        let remaining: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance - $2, updated_at = NOW()
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(quote.total)
        .fetch_optional(&mut *tx)
        .await?;
        let remaining = remaining.ok_or(ApiError::InsufficientFunds {
            balance,
            total: quote.total,
        })?;

        let order = checkout::build_order(account_id, quote, shipping_address);
        Self::insert_order(&mut tx, &order).await?;

        sqlx::query("DELETE FROM cart_items WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            account_id = %account_id,
            order_id = %order.id,
            total = %order.total_amount,
            "Order placed"
        );
        Ok((order, remaining))
    }

    async fn list_for_account(&self, account_id: Uuid) -> ApiResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.account_id = $1 \
             ORDER BY o.created_at DESC, o.id"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_lines(&mut orders).await?;
        Ok(orders)
    }

    async fn list_all(&self) -> ApiResult<Vec<OrderWithOwner>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS},
                   a.id AS owner_id, a.username AS owner_username, a.email AS owner_email
            FROM orders o
            LEFT JOIN accounts a ON a.id = o.account_id
            ORDER BY o.created_at DESC, o.id
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        let mut owners = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(order_from_row(row)?);
            owners.push(owner_from_row(row)?);
        }
        self.attach_lines(&mut orders).await?;

        Ok(orders
            .into_iter()
            .zip(owners)
            .map(|(order, account)| OrderWithOwner { order, account })
            .collect())
    }
}
