//! Pricing and debit rules applied when a cart becomes an order.
//!
//! Storage backends run these inside their own atomic unit: the account
//! row is locked, the cart is priced from current catalog state, the
//! balance is debited, and the order is written, all or nothing.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Order, OrderLine, ShippingAddress};

/// A cart line joined with the product's price at checkout time
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Sum `unit_price * quantity` over the lines. Fails on an empty cart.
pub fn quote(lines: Vec<PricedLine>) -> Result<Quote, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::EmptyCart);
    }

    let mut total = Decimal::ZERO;
    for line in &lines {
        total = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| ApiError::Validation("Order total is out of range".to_string()))?;
    }

    Ok(Quote { lines, total })
}

/// Balance left after paying `total`
pub fn debit(balance: Decimal, total: Decimal) -> Result<Decimal, ApiError> {
    if balance < total {
        return Err(ApiError::InsufficientFunds { balance, total });
    }
    Ok(balance - total)
}

/// Freeze a quote into an order
pub fn build_order(account_id: Uuid, quote: Quote, shipping_address: ShippingAddress) -> Order {
    let items = quote
        .lines
        .into_iter()
        .map(|line| OrderLine {
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect();

    Order {
        id: Uuid::new_v4(),
        account_id,
        items,
        total_amount: quote.total,
        shipping_address,
        created_at: Utc::now(),
    }
}
