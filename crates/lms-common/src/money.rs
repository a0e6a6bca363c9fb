//! Money helpers
//!
//! Prices are stored as `NUMERIC(10,2)` in major currency units. Payment
//! gateways expect integer minor units (kobo, cents), i.e. the amount × 100.

use bigdecimal::{BigDecimal, RoundingMode, Signed, ToPrimitive, Zero};
use std::str::FromStr;

use crate::error::{LmsError, Result};

/// Largest price accepted by the `NUMERIC(10,2)` column.
pub const MAX_PRICE_MAJOR: i64 = 99_999_999;

/// Convert a major-unit amount to integer minor units (× 100).
///
/// Sub-minor fractions are rounded half-up, matching how the stored column
/// would round them.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64> {
    if amount.is_negative() {
        return Err(LmsError::InvalidAmount(format!("{} is negative", amount)));
    }

    let minor = (amount * BigDecimal::from(100)).with_scale_round(0, RoundingMode::HalfUp);
    minor
        .to_i64()
        .ok_or_else(|| LmsError::InvalidAmount(format!("{} does not fit in minor units", amount)))
}

/// Convert integer minor units back to a two-decimal major amount.
pub fn from_minor_units(minor: i64) -> BigDecimal {
    BigDecimal::new(minor.into(), 2)
}

/// Parse a user-supplied price, rejecting negatives and values the column
/// cannot hold.
pub fn parse_price(raw: &str) -> Result<BigDecimal> {
    let value = BigDecimal::from_str(raw.trim())
        .map_err(|_| LmsError::InvalidAmount(format!("'{}' is not a number", raw)))?;
    validate_price(&value)?;
    Ok(value.with_scale_round(2, RoundingMode::HalfUp))
}

/// Check that a price is within `0 ..= MAX_PRICE_MAJOR`.
pub fn validate_price(value: &BigDecimal) -> Result<()> {
    if value.is_negative() {
        return Err(LmsError::InvalidAmount("price cannot be negative".to_string()));
    }
    if value > &BigDecimal::from(MAX_PRICE_MAJOR) {
        return Err(LmsError::InvalidAmount(format!(
            "price cannot exceed {}",
            MAX_PRICE_MAJOR
        )));
    }
    Ok(())
}

/// True when the amount is exactly zero (a free course).
pub fn is_free(amount: &BigDecimal) -> bool {
    amount.is_zero()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_minor_units() {
        let price = BigDecimal::from_str("49.99").unwrap();
        assert_eq!(to_minor_units(&price).unwrap(), 4999);

        let whole = BigDecimal::from(150);
        assert_eq!(to_minor_units(&whole).unwrap(), 15000);
    }

    #[test]
    fn test_to_minor_units_rounds_half_up() {
        let price = BigDecimal::from_str("10.005").unwrap();
        assert_eq!(to_minor_units(&price).unwrap(), 1001);
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        let price = BigDecimal::from_str("-1").unwrap();
        assert!(to_minor_units(&price).is_err());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" 12.5 ").unwrap(), BigDecimal::from_str("12.50").unwrap());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("-3").is_err());
        assert!(parse_price("100000000").is_err());
    }

    #[test]
    fn test_is_free() {
        assert!(is_free(&BigDecimal::from(0)));
        assert!(is_free(&BigDecimal::from_str("0.00").unwrap()));
        assert!(!is_free(&BigDecimal::from_str("0.01").unwrap()));
    }

    proptest! {
        #[test]
        fn minor_units_survive_conversion(minor in 0i64..10_000_000_000) {
            let major = from_minor_units(minor);
            prop_assert_eq!(to_minor_units(&major).unwrap(), minor);
        }
    }
}
