use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::time_value::discount_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ValuationOutcome;

use super::assumptions::Assumptions;
use super::dcf::ValuationResult;
use super::reconcile::{reconcile, Reconciliation};

/// EV/EBITDA exit valuation, discounted from the exit year to today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplesValuation {
    pub exit_year: u32,
    pub exit_year_ebitda: Money,
    pub multiple: Multiple,
    /// exit_year_ebitda * multiple, at the exit year
    pub undiscounted_value: Money,
    pub discount_factor: Rate,
    /// Present value of the exit value
    pub enterprise_value: Money,
}

/// Value the company as `exit_year_ebitda * multiple`, discounted at WACC over
/// the forecast horizon. Only EBITDA enters; free cash flow plays no part.
pub fn multiples_valuation(
    assumptions: &Assumptions,
    exit_year_ebitda: Money,
    multiple: Multiple,
) -> ValuationOutcome<MultiplesValuation> {
    if multiple < Decimal::ZERO {
        return Err(ValuationError::invalid(
            "exit_multiple",
            format!("Exit multiple cannot be negative, got {multiple}"),
        ));
    }
    if assumptions.forecast_years < 1 {
        return Err(ValuationError::invalid(
            "forecast_years",
            "Forecast horizon must be at least 1 year",
        ));
    }
    if assumptions.wacc <= Decimal::ZERO {
        return Err(ValuationError::invalid("wacc", "WACC must be positive"));
    }

    let exit_year = assumptions.horizon();
    let discount_factor = discount_factor(assumptions.wacc, exit_year)?;
    let undiscounted_value = exit_year_ebitda
        .checked_mul(multiple)
        .ok_or_else(|| ValuationError::out_of_range("exit_multiple", "Exit value"))?;

    Ok(MultiplesValuation {
        exit_year,
        exit_year_ebitda,
        multiple,
        undiscounted_value,
        discount_factor,
        enterprise_value: undiscounted_value * discount_factor,
    })
}

/// Multiples path as written to its own artifact: the exit-multiple valuation
/// plus its reconciliation against the DCF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplesReport {
    #[serde(flatten)]
    pub valuation: MultiplesValuation,
    pub reconciliation: Reconciliation,
}

/// Multiples report in the standard output envelope, built from a DCF result.
/// The multiples section is computed here if the pipeline has not already
/// filled it in.
pub fn calculate_multiples(
    result: &ValuationResult,
) -> ValuationOutcome<ComputationOutput<MultiplesReport>> {
    let start = Instant::now();
    let assumptions = &result.assumptions;
    let mut warnings = Vec::new();

    let valuation = match &result.multiples {
        Some(m) => m.clone(),
        None => {
            let exit_ebitda = result
                .exit_year()
                .map(|p| p.ebitda)
                .ok_or_else(|| ValuationError::invalid("forecast_years", "No exit year"))?;
            multiples_valuation(assumptions, exit_ebitda, assumptions.exit_multiple)?
        }
    };
    let reconciliation = match &result.reconciliation {
        Some(r) => r.clone(),
        None => reconcile(result.enterprise_value, valuation.enterprise_value)?,
    };
    if !reconciliation.agrees_within(dec!(25)) {
        warnings.push(format!(
            "DCF and multiples enterprise values differ by {:.1}%",
            reconciliation.percentage_difference
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "EV/EBITDA exit multiple, discounted at WACC",
        &serde_json::json!({
            "exit_year_ebitda": valuation.exit_year_ebitda,
            "exit_multiple": valuation.multiple,
            "wacc": assumptions.wacc,
            "forecast_years": assumptions.forecast_years,
        }),
        warnings,
        elapsed,
        MultiplesReport {
            valuation,
            reconciliation,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiples_basic() {
        let a = Assumptions {
            wacc: dec!(0.10),
            forecast_years: 2,
            ..Assumptions::default()
        };
        let m = multiples_valuation(&a, dec!(50), dec!(8)).unwrap();
        assert_eq!(m.exit_year, 2);
        assert_eq!(m.undiscounted_value, dec!(400));
        assert_eq!(m.discount_factor, Decimal::ONE / dec!(1.21));
        assert_eq!(m.enterprise_value, dec!(400) * m.discount_factor);
    }

    #[test]
    fn test_zero_multiple_gives_zero_value() {
        let m = multiples_valuation(&Assumptions::default(), dec!(50), Decimal::ZERO).unwrap();
        assert!(m.enterprise_value.is_zero());
    }

    #[test]
    fn test_oversized_multiple_is_an_error() {
        let err = multiples_valuation(&Assumptions::default(), dec!(1_000_000_000), Decimal::MAX)
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
    }

    #[test]
    fn test_negative_multiple_rejected() {
        let err = multiples_valuation(&Assumptions::default(), dec!(50), dec!(-1)).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
    }

    #[test]
    fn test_report_from_dcf_only_result() {
        let dcf = crate::valuation::dcf_valuation(&Assumptions::default()).unwrap();
        let out = calculate_multiples(&dcf).unwrap();
        let exit = dcf.exit_year().unwrap();
        assert_eq!(out.result.valuation.exit_year_ebitda, exit.ebitda);
        assert_eq!(out.result.reconciliation.dcf_value, dcf.enterprise_value);
        assert_eq!(out.assumptions["forecast_years"], 5);
    }

    #[test]
    fn test_report_zero_multiple_not_computable() {
        let a = Assumptions {
            exit_multiple: Decimal::ZERO,
            ..Assumptions::default()
        };
        let dcf = crate::valuation::dcf_valuation(&a).unwrap();
        assert!(matches!(
            calculate_multiples(&dcf),
            Err(ValuationError::DivisionByZero { .. })
        ));
    }
}
