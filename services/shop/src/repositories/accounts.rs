//! Account repository for the administrative routes

use async_trait::async_trait;
use common::Role;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Account;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// All accounts, test accounts included
    async fn list(&self) -> ApiResult<Vec<Account>>;

    async fn find(&self, id: Uuid) -> ApiResult<Option<Account>>;

    /// Add `amount` (possibly negative) to the balance. No floor is applied.
    async fn adjust_balance(&self, id: Uuid, amount: Decimal) -> ApiResult<Account>;

    /// Takes effect on tokens issued afterwards
    async fn set_role(&self, id: Uuid, role: Role) -> ApiResult<Account>;

    /// Hard delete; carts and orders of the account are left in place
    async fn delete(&self, id: Uuid) -> ApiResult<()>;
}

/// SQLSTATE `numeric_value_out_of_range`
const NUMERIC_OUT_OF_RANGE: &str = "22003";

const ACCOUNT_COLUMNS: &str =
    "id, username, email, role, is_verified, balance, is_test_account, created_at, updated_at";

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role,
        is_verified: row.try_get("is_verified")?,
        balance: row.try_get("balance")?,
        is_test_account: row.try_get("is_test_account")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL-backed account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn list(&self) -> ApiResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find(&self, id: Uuid) -> ApiResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn adjust_balance(&self, id: Uuid, amount: Decimal) -> ApiResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) => {
                ApiError::Validation("Balance is out of range".to_string())
            }
            e => e.into(),
        })?;

        let account = row
            .as_ref()
            .map(account_from_row)
            .transpose()?
            .ok_or(ApiError::NotFound("User"))?;

        if account.balance < Decimal::ZERO {
            warn!(account_id = %id, balance = %account.balance, "Balance adjusted below zero");
        } else {
            info!(account_id = %id, %amount, "Balance adjusted");
        }
        Ok(account)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> ApiResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let account = row
            .as_ref()
            .map(account_from_row)
            .transpose()?
            .ok_or(ApiError::NotFound("User"))?;

        info!(account_id = %id, role = %role, "Role changed");
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User"));
        }
        info!(account_id = %id, "Account deleted");
        Ok(())
    }
}
