//! Validation helpers for engine inputs
//!
//! Pure checks applied at the boundary, before any transaction is attempted.

use rust_decimal::Decimal;

/// Movement and ingredient quantities must be strictly positive.
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Costs and prices may be zero but never negative.
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// A tax rate is a fraction, e.g. 0.16 for 16%.
pub fn validate_tax_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err("Tax rate must be in [0, 1)");
    }
    Ok(())
}
