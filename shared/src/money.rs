//! Money calculation utilities using rust_decimal for precision
//!
//! Prices and totals stay `Decimal` end to end; rounding to 2 decimal places
//! (half away from zero) happens only on derived values.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Round a monetary value to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// unit_price × quantity, unrounded
#[inline]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Tax on a subtotal at a fractional rate (0.08 = 8%), rounded to cents
#[inline]
pub fn tax_on(subtotal: Decimal, rate: Decimal) -> Decimal {
    round_money(subtotal * rate)
}

/// Validate a requested line quantity
pub fn validate_quantity(quantity: u32) -> Result<(), String> {
    if quantity > MAX_QUANTITY {
        return Err(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        ));
    }
    Ok(())
}
