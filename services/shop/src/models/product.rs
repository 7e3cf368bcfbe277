//! Catalog product model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::money::validate_amount;

/// Catalog entry. Carts reference it live; orders copy name and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Non-negative, at most two decimal places
    pub price: Decimal,
    /// Empty when the product has no image
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub image_url: String,
}

impl NewProduct {
    pub fn validate(&self) -> Result<Decimal, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Product name is required".to_string()));
        }
        let price = self
            .price
            .ok_or_else(|| ApiError::Validation("Product price is required".to_string()))?;
        validate_price(price)?;
        Ok(price)
    }
}

/// Partial product update; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
}

impl UpdateProduct {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::Validation("Product name is required".to_string()));
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = image_url.clone();
        }
    }
}

fn validate_price(price: Decimal) -> Result<(), ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::Validation(
            "Product price cannot be negative".to_string(),
        ));
    }
    validate_amount(price, "Product price")
}
