pub mod assumptions;
pub mod dcf;
pub mod multiples;
pub mod reconcile;

use crate::ValuationOutcome;

pub use assumptions::{Assumptions, CashFlowModel, Driver};
pub use dcf::{dcf_valuation, project_cash_flows, terminal_value, ValuationResult, YearProjection};
pub use multiples::{calculate_multiples, multiples_valuation, MultiplesReport, MultiplesValuation};
pub use reconcile::{reconcile, Reconciliation};

/// Full pipeline: DCF, then the exit-multiple cross-check on the same
/// exit-year EBITDA, then reconciliation of the two values.
pub fn value_company(assumptions: &Assumptions) -> ValuationOutcome<ValuationResult> {
    let mut result = dcf_valuation(assumptions)?;

    let exit_ebitda = result
        .exit_year()
        .map(|p| p.ebitda)
        .ok_or_else(|| crate::ValuationError::invalid("forecast_years", "No exit year"))?;

    let multiples = multiples_valuation(assumptions, exit_ebitda, assumptions.exit_multiple)?;
    let reconciliation = reconcile(result.enterprise_value, multiples.enterprise_value)?;

    tracing::info!(
        company = %assumptions.company_name,
        dcf_ev = %result.enterprise_value,
        multiples_ev = %multiples.enterprise_value,
        pct_difference = %reconciliation.percentage_difference.round_dp(2),
        "valuation reconciled"
    );

    result.multiples = Some(multiples);
    result.reconciliation = Some(reconciliation);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_value_company_populates_all_sections() {
        let result = value_company(&Assumptions::default()).unwrap();
        let m = result.multiples.as_ref().unwrap();
        let r = result.reconciliation.as_ref().unwrap();
        assert_eq!(m.exit_year_ebitda, result.exit_year().unwrap().ebitda);
        assert_eq!(r.dcf_value, result.enterprise_value);
        assert_eq!(r.multiples_value, m.enterprise_value);
    }

    #[test]
    fn test_value_company_zero_multiple_aborts() {
        let a = Assumptions {
            exit_multiple: Decimal::ZERO,
            ..Assumptions::default()
        };
        assert!(matches!(
            value_company(&a),
            Err(crate::ValuationError::DivisionByZero { .. })
        ));
    }
}
