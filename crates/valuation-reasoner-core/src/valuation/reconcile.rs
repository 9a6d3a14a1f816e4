use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::Money;
use crate::ValuationOutcome;

/// Comparison of the DCF and multiples enterprise values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub dcf_value: Money,
    pub multiples_value: Money,
    /// dcf_value - multiples_value
    pub absolute_difference: Money,
    /// (dcf_value - multiples_value) / multiples_value * 100
    pub percentage_difference: Decimal,
}

impl Reconciliation {
    /// Whether the two methods are within `tolerance_pct` percent of each other.
    pub fn agrees_within(&self, tolerance_pct: Decimal) -> bool {
        self.percentage_difference.abs() <= tolerance_pct
    }
}

/// Compare the two enterprise values. A zero multiples value is rejected
/// up front rather than divided by.
pub fn reconcile(dcf_value: Money, multiples_value: Money) -> ValuationOutcome<Reconciliation> {
    if multiples_value.is_zero() {
        return Err(ValuationError::DivisionByZero {
            context: "reconciliation percentage difference (multiples enterprise value is zero)"
                .into(),
        });
    }

    let absolute_difference = dcf_value
        .checked_sub(multiples_value)
        .ok_or_else(|| ValuationError::out_of_range("exit_multiple", "Reconciliation difference"))?;
    let percentage_difference = absolute_difference
        .checked_div(multiples_value)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .ok_or_else(|| ValuationError::out_of_range("exit_multiple", "Reconciliation percentage"))?;

    Ok(Reconciliation {
        dcf_value,
        multiples_value,
        absolute_difference,
        percentage_difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_zero_pct() {
        let r = reconcile(dec!(1234.5), dec!(1234.5)).unwrap();
        assert!(r.percentage_difference.is_zero());
        assert!(r.absolute_difference.is_zero());
    }

    #[test]
    fn test_pct_difference() {
        let r = reconcile(dec!(110), dec!(100)).unwrap();
        assert_eq!(r.absolute_difference, dec!(10));
        assert_eq!(r.percentage_difference, dec!(10));
        assert!(r.agrees_within(dec!(10)));
        assert!(!r.agrees_within(dec!(9.99)));
    }

    #[test]
    fn test_dcf_below_multiples() {
        let r = reconcile(dec!(75), dec!(100)).unwrap();
        assert_eq!(r.percentage_difference, dec!(-25));
    }

    #[test]
    fn test_tiny_multiples_value_out_of_range() {
        let err = reconcile(dec!(1_000_000_000_000_000_000), dec!(0.0000000001)).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
    }

    #[test]
    fn test_zero_multiples_value() {
        let err = reconcile(dec!(100), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ValuationError::DivisionByZero { .. }));
        assert!(err.to_string().contains("not computable"));
    }
}
