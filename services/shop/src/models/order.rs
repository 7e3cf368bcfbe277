//! Order model; orders are immutable once placed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::AccountSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.street.trim().is_empty()
            || self.city.trim().is_empty()
            || self.postal_code.trim().is_empty()
        {
            return Err(ApiError::Validation(
                "Shipping address requires street, city and postal code".to_string(),
            ));
        }
        Ok(())
    }
}

/// Line snapshot; `unit_price` is the catalog price at checkout time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub account_id: Uuid,
    pub items: Vec<OrderLine>,
    /// Sum of `quantity * unit_price` over the lines
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

/// Order with its owner, for the administrative listing. The owner is
/// `None` once the account has been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithOwner {
    #[serde(flatten)]
    pub order: Order,
    pub account: Option<AccountSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub order: Order,
    pub user_balance: Decimal,
}
