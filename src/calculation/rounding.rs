//! Monetary rounding helpers.
//!
//! Every monetary value the engine emits is rounded to cents where it is
//! computed, never accumulated unrounded and rounded once at the end.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, EngineResult};

/// Number of decimal places of every emitted monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds to cents (half away from zero) and forces exactly two decimal places.
///
/// # Example
///
/// ```
/// use care_billing::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("2.345").unwrap()).to_string(), "2.35");
/// assert_eq!(round_money(Decimal::from(7)).to_string(), "7.00");
/// ```
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Total of one invoice line: `quantity * unit_price`, rounded to cents.
///
/// Fails with [`EngineError::CalculationError`] if the product overflows.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> EngineResult<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("line total {} x {} overflows", quantity, unit_price),
        })
}
