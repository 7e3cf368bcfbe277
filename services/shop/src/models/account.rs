//! Account views used by the administrative routes

use chrono::{DateTime, Utc};
use common::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account as seen by the shop; the password hash is never loaded
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    /// Spendable funds; only administrative adjustments can push it negative
    pub balance: Decimal,
    /// Seeded accounts, never created through registration
    pub is_test_account: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order owner as shown in the administrative order listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        AccountSummary {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
        }
    }
}

/// Body of `PUT /users/balance/:id`; `amount` is added, so it may be negative
#[derive(Debug, Deserialize)]
pub struct BalanceAdjustment {
    pub amount: Option<Decimal>,
}

/// Body of `PUT /users/:id/role`
#[derive(Debug, Deserialize)]
pub struct RoleChange {
    #[serde(default)]
    pub role: String,
}
