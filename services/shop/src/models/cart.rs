//! Shopping cart model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Product;

/// One line of a cart, carrying the product's current catalog state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: i32,
}

/// Per-account cart; lines keep insertion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cart {
    pub account_id: Uuid,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(account_id: Uuid) -> Self {
        Cart {
            account_id,
            items: Vec::new(),
        }
    }
}

fn default_quantity() -> i32 {
    1
}

/// Body of `POST /cart/add`; quantity defaults to one and adds to an existing line
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Body of `PUT /cart/update`; sets the line quantity outright
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

/// Unwrap a required product id from a request body
pub fn require_product_id(product_id: Option<Uuid>) -> Result<Uuid, ApiError> {
    product_id.ok_or_else(|| ApiError::Validation("Product ID is required".to_string()))
}

/// Cart quantities must be at least one
pub fn validate_quantity(quantity: i32) -> Result<(), ApiError> {
    if quantity < 1 {
        return Err(ApiError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}
