//! Monetary types and minor-unit arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::DomainError;

/// Ledger amount represented as a Decimal for precision.
pub type Amount = Decimal;

/// Default number of decimal places in the ledger currency.
pub const DEFAULT_MINOR_UNITS: u32 = 2;

/// Round half-up to the ledger's minor units.
///
/// Amounts in the ledger are never negative, so away-from-zero midpoint
/// rounding is half-up.
#[must_use]
pub fn round_minor(amount: Amount, minor_units: u32) -> Amount {
    amount
        .round_dp_with_strategy(minor_units, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Validate an amount about to move through the ledger.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if the amount is not positive or
/// carries more decimal places than `minor_units`.
pub fn validate_amount(amount: Amount, minor_units: u32) -> Result<Amount, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::InvalidAmount {
            amount,
            reason: "must be greater than zero",
        });
    }
    let normalized = amount.normalize();
    if normalized.scale() > minor_units {
        return Err(DomainError::InvalidAmount {
            amount,
            reason: "more precise than the ledger minor units",
        });
    }
    Ok(normalized)
}

fn out_of_range(amount: Amount) -> DomainError {
    DomainError::InvalidAmount {
        amount,
        reason: "result exceeds the representable range",
    }
}

/// `a + b`, failing instead of overflowing.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] carrying `b` if the sum does not fit.
pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, DomainError> {
    a.checked_add(b).ok_or_else(|| out_of_range(b))
}

/// `value * numerator / denominator`.
///
/// Multiplies first to keep every digit; divides first when the product
/// would not fit.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if neither order fits or the
/// denominator is zero.
pub fn mul_div(value: Amount, numerator: Decimal, denominator: Decimal) -> Result<Amount, DomainError> {
    value
        .checked_mul(numerator)
        .and_then(|product| product.checked_div(denominator))
        .or_else(|| {
            value
                .checked_div(denominator)
                .and_then(|ratio| ratio.checked_mul(numerator))
        })
        .ok_or_else(|| out_of_range(value))
}

/// `percent` of `amount`, rounded to minor units.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if the result does not fit.
pub fn percent_of(amount: Amount, percent: Decimal, minor_units: u32) -> Result<Amount, DomainError> {
    Ok(round_minor(
        mul_div(amount, percent, Decimal::ONE_HUNDRED)?,
        minor_units,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_minor_is_half_up() {
        assert_eq!(round_minor(dec!(1.005), 2), dec!(1.01));
        assert_eq!(round_minor(dec!(1.004), 2), dec!(1.00));
        assert_eq!(round_minor(dec!(333.3333), 2), dec!(333.33));
        assert_eq!(round_minor(dec!(666.6666), 2), dec!(666.67));
    }

    #[test]
    fn validate_amount_rejects_non_positive() {
        assert!(matches!(
            validate_amount(Decimal::ZERO, 2),
            Err(DomainError::InvalidAmount { .. })
        ));
        assert!(matches!(
            validate_amount(dec!(-1), 2),
            Err(DomainError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn validate_amount_rejects_sub_minor_precision() {
        assert!(validate_amount(dec!(10.001), 2).is_err());
        assert_eq!(validate_amount(dec!(10.10), 2).unwrap(), dec!(10.1));
        assert_eq!(validate_amount(dec!(10.000), 2).unwrap(), dec!(10));
    }

    #[test]
    fn percent_of_rounds_to_minor_units() {
        assert_eq!(percent_of(dec!(1000), dec!(10), 2).unwrap(), dec!(100));
        assert_eq!(percent_of(dec!(333), dec!(7.5), 2).unwrap(), dec!(24.98));
    }

    #[test]
    fn checked_add_reports_overflow() {
        assert_eq!(checked_add(dec!(1.5), dec!(2.25)).unwrap(), dec!(3.75));
        assert!(matches!(
            checked_add(Decimal::MAX, dec!(1)),
            Err(DomainError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn mul_div_divides_first_when_the_product_overflows() {
        assert_eq!(mul_div(dec!(300), dec!(900), dec!(1000)).unwrap(), dec!(270));

        let stake = dec!(1000000000000000);
        let pool = dec!(1800000000000000);
        let total = dec!(2000000000000000);
        assert!(stake.checked_mul(pool).is_none());
        assert_eq!(round_minor(mul_div(stake, pool, total).unwrap(), 2), dec!(900000000000000));
    }

    #[test]
    fn mul_div_reports_unrepresentable_results() {
        assert!(mul_div(Decimal::MAX, dec!(10), dec!(0.5)).is_err());
        assert!(mul_div(dec!(1), dec!(1), Decimal::ZERO).is_err());
    }
}
