//! Account model and related payloads

use chrono::{DateTime, Utc};
use common::Role;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Account entity
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub balance: Decimal,
    pub is_test_account: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account may log in without confirming its email
    pub fn can_log_in(&self) -> bool {
        self.is_verified || self.is_test_account
    }
}

/// New account creation payload
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_test_account: bool,
}

/// Account as returned to clients, without the password hash
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub balance: Decimal,
    pub is_test_account: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        AccountResponse {
            id: account.id,
            username: account.username,
            email: account.email,
            role: account.role,
            is_verified: account.is_verified,
            balance: account.balance,
            is_test_account: account.is_test_account,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
