//! Limits of the `NUMERIC(12, 2)` money columns

use rust_decimal::Decimal;

use crate::error::ApiError;

/// Amounts must stay strictly below this magnitude
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Decimal places stored for money
pub const MONEY_SCALE: u32 = 2;

/// Reject amounts the money columns cannot hold exactly
pub fn validate_amount(amount: Decimal, field: &str) -> Result<(), ApiError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ApiError::Validation(format!(
            "{} cannot have more than {} decimal places",
            field, MONEY_SCALE
        )));
    }
    check_range(amount, field)
}

/// Reject amounts at or beyond [`MAX_AMOUNT`]
pub fn check_range(amount: Decimal, field: &str) -> Result<(), ApiError> {
    if amount.abs() >= MAX_AMOUNT {
        return Err(ApiError::Validation(format!("{} is out of range", field)));
    }
    Ok(())
}
