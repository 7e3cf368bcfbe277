//! Account repository for database operations

use async_trait::async_trait;
use common::{Role, error::DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{Account, NewAccount};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account; fails with a unique violation on a taken username or email
    async fn create(&self, new_account: &NewAccount) -> DatabaseResult<Account>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>>;

    async fn mark_verified(&self, id: Uuid) -> DatabaseResult<()>;

    /// Hard delete; returns whether a row was removed
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, role, is_verified, balance, \
                               is_test_account, created_at, updated_at";

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
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
    async fn create(&self, new_account: &NewAccount) -> DatabaseResult<Account> {
        info!("Creating account: {}", new_account.username);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, role, is_verified, is_test_account)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_account.username)
        .bind(&new_account.email)
        .bind(&new_account.password_hash)
        .bind(new_account.role.as_str())
        .bind(new_account.is_verified)
        .bind(new_account.is_test_account)
        .fetch_one(&self.pool)
        .await?;

        Ok(account_from_row(&row)?)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn mark_verified(&self, id: Uuid) -> DatabaseResult<()> {
        sqlx::query("UPDATE accounts SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
