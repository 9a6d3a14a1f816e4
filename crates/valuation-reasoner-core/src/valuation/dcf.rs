use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::time_value::{discount_factor, growing_perpetuity};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ValuationOutcome;

use super::assumptions::{Assumptions, CashFlowModel};
use super::multiples::MultiplesValuation;
use super::reconcile::Reconciliation;

/// Terminal value share of EV above which a warning is raised.
const TERMINAL_SHARE_WARNING: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Projection for a single forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub growth_rate: Rate,
    pub revenue: Money,
    pub ebitda: Money,
    /// Tax charge deducted in the FCF bridge (zero for the reinvestment model)
    pub tax: Money,
    pub capex: Money,
    pub depreciation: Money,
    pub working_capital_change: Money,
    /// Amount withheld under the reinvestment model
    pub reinvestment: Money,
    pub free_cash_flow: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Aggregate valuation. The DCF fields are always populated; the multiples
/// and reconciliation sections are filled in by the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub assumptions: Assumptions,
    pub projections: Vec<YearProjection>,
    /// Sum of present values of explicit-period free cash flows
    pub pv_of_fcf: Money,
    /// Gordon growth terminal value at the end of the horizon
    pub terminal_value: Money,
    /// Discount factor applied to the terminal value
    pub terminal_discount_factor: Rate,
    /// Present value of the terminal value
    pub pv_of_terminal: Money,
    /// Enterprise value = PV(FCFs) + PV(TV)
    pub enterprise_value: Money,
    /// PV(TV) / EV
    pub terminal_value_pct: Rate,
    /// TV / exit-year EBITDA
    pub implied_exit_multiple: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiples: Option<MultiplesValuation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}

impl ValuationResult {
    /// Exit-year projection. Always present once the result exists.
    pub fn exit_year(&self) -> Option<&YearProjection> {
        self.projections.last()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project revenue, EBITDA and free cash flow for each forecast year and
/// discount each year at WACC (end-of-year convention).
pub fn project_cash_flows(assumptions: &Assumptions) -> ValuationOutcome<Vec<YearProjection>> {
    assumptions.validate()?;

    let n_years = assumptions.horizon();
    // horizons are unbounded until the arithmetic overflows; cap the preallocation
    let mut projections = Vec::with_capacity(n_years.min(100) as usize);
    let mut prev_revenue = assumptions.base_revenue;

    for year in 1..=n_years {
        let growth_rate = assumptions.growth_for_year(year);
        let revenue = prev_revenue
            .checked_mul(Decimal::ONE + growth_rate)
            .ok_or_else(|| {
                ValuationError::out_of_range("forecast_years", format!("Revenue in year {year}"))
            })?;
        if revenue <= Decimal::ZERO {
            return Err(ValuationError::invalid(
                "revenue_growth_rates",
                format!("Projected revenue for year {year} is not positive ({revenue})"),
            ));
        }
        let ebitda = revenue * assumptions.ebitda_margin;

        let bridge = cash_flow_bridge(assumptions, revenue, prev_revenue, ebitda)
            .ok_or_else(|| {
                ValuationError::out_of_range("cash_flow", format!("Free cash flow in year {year}"))
            })?;

        let discount_factor = discount_factor(assumptions.wacc, year)?;
        let present_value = bridge.free_cash_flow * discount_factor;

        tracing::trace!(year, %revenue, fcf = %bridge.free_cash_flow, %present_value, "projected year");

        projections.push(YearProjection {
            year,
            growth_rate,
            revenue,
            ebitda,
            tax: bridge.tax,
            capex: bridge.capex,
            depreciation: bridge.depreciation,
            working_capital_change: bridge.working_capital_change,
            reinvestment: bridge.reinvestment,
            free_cash_flow: bridge.free_cash_flow,
            discount_factor,
            present_value,
        });

        prev_revenue = revenue;
    }

    Ok(projections)
}

/// Gordon growth terminal value on the last forecast year's free cash flow.
///
/// Fails with `DivergentModel` when `wacc <= terminal_growth`.
pub fn terminal_value(
    last_year_fcf: Money,
    wacc: Rate,
    terminal_growth: Rate,
) -> ValuationOutcome<Money> {
    growing_perpetuity(last_year_fcf, wacc, terminal_growth)
}

/// DCF enterprise value: PV of projected FCFs plus PV of the terminal value.
pub fn dcf_valuation(assumptions: &Assumptions) -> ValuationOutcome<ValuationResult> {
    let projections = project_cash_flows(assumptions)?;

    let last = projections.last().ok_or_else(|| {
        ValuationError::invalid("forecast_years", "No projection years generated")
    })?;

    let terminal_value = terminal_value(
        last.free_cash_flow,
        assumptions.wacc,
        assumptions.terminal_growth_rate,
    )?;
    let terminal_discount_factor = last.discount_factor;
    let pv_of_terminal = terminal_value * terminal_discount_factor;

    let pv_of_fcf = projections
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.present_value))
        .ok_or_else(|| ValuationError::out_of_range("forecast_years", "Sum of discounted FCFs"))?;
    let enterprise_value = pv_of_fcf
        .checked_add(pv_of_terminal)
        .ok_or_else(|| ValuationError::out_of_range("forecast_years", "Enterprise value"))?;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal
            .checked_div(enterprise_value)
            .ok_or_else(|| ValuationError::out_of_range("cash_flow", "Terminal value share of EV"))?
    };
    let implied_exit_multiple = if last.ebitda.is_zero() {
        Decimal::ZERO
    } else {
        terminal_value
            .checked_div(last.ebitda)
            .ok_or_else(|| ValuationError::out_of_range("ebitda_margin", "Implied exit multiple"))?
    };

    tracing::debug!(
        wacc = %assumptions.wacc,
        terminal_growth = %assumptions.terminal_growth_rate,
        %enterprise_value,
        "dcf valuation complete"
    );

    Ok(ValuationResult {
        assumptions: assumptions.clone(),
        projections,
        pv_of_fcf,
        terminal_value,
        terminal_discount_factor,
        pv_of_terminal,
        enterprise_value,
        terminal_value_pct,
        implied_exit_multiple,
        multiples: None,
        reconciliation: None,
    })
}

/// DCF valuation wrapped in the standard output envelope.
pub fn calculate_dcf(
    assumptions: &Assumptions,
) -> ValuationOutcome<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let result = dcf_valuation(assumptions)?;
    let warnings = dcf_warnings(&result);
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCF DCF with Gordon growth terminal value (end-of-year discounting)",
        assumptions,
        warnings,
        elapsed,
        result,
    ))
}

/// Reasonableness warnings for a computed DCF.
pub fn dcf_warnings(result: &ValuationResult) -> Vec<String> {
    let mut warnings = Vec::new();
    if result.terminal_value_pct > TERMINAL_SHARE_WARNING {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            result.terminal_value_pct * dec!(100)
        ));
    }
    if result.projections.iter().any(|p| p.free_cash_flow < Decimal::ZERO) {
        warnings.push("One or more forecast years have negative free cash flow".to_string());
    }
    warnings
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct CashFlowBridge {
    tax: Money,
    capex: Money,
    depreciation: Money,
    working_capital_change: Money,
    reinvestment: Money,
    free_cash_flow: Money,
}

/// `None` when any line of the bridge leaves the decimal range.
fn cash_flow_bridge(
    assumptions: &Assumptions,
    revenue: Money,
    prev_revenue: Money,
    ebitda: Money,
) -> Option<CashFlowBridge> {
    let t = assumptions.tax_rate;
    match &assumptions.cash_flow {
        CashFlowModel::Standard {
            capex,
            depreciation,
            working_capital,
        } => {
            let capex = capex.amount(revenue)?;
            let depreciation = depreciation.amount(revenue)?;
            let working_capital_change = working_capital.working_capital_change(revenue, prev_revenue)?;
            let tax = ebitda * t;
            let free_cash_flow = (ebitda - tax)
                .checked_sub(capex)?
                .checked_add(depreciation)?
                .checked_sub(working_capital_change)?;
            Some(CashFlowBridge {
                tax,
                capex,
                depreciation,
                working_capital_change,
                reinvestment: Decimal::ZERO,
                free_cash_flow,
            })
        }
        CashFlowModel::Nopat {
            capex,
            depreciation,
            working_capital,
        } => {
            let capex = capex.amount(revenue)?;
            let depreciation = depreciation.amount(revenue)?;
            let working_capital_change = working_capital.working_capital_change(revenue, prev_revenue)?;
            let ebit = ebitda.checked_sub(depreciation)?;
            let tax = ebit * t;
            let free_cash_flow = (ebit - tax)
                .checked_add(depreciation)?
                .checked_sub(capex)?
                .checked_sub(working_capital_change)?;
            Some(CashFlowBridge {
                tax,
                capex,
                depreciation,
                working_capital_change,
                reinvestment: Decimal::ZERO,
                free_cash_flow,
            })
        }
        CashFlowModel::Reinvestment { reinvestment_rate } => {
            let reinvestment = ebitda * *reinvestment_rate;
            Some(CashFlowBridge {
                tax: Decimal::ZERO,
                capex: Decimal::ZERO,
                depreciation: Decimal::ZERO,
                working_capital_change: Decimal::ZERO,
                reinvestment,
                free_cash_flow: ebitda - reinvestment,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::assumptions::Driver;
    use rust_decimal_macros::dec;

    fn sample_assumptions() -> Assumptions {
        Assumptions {
            company_name: "Sample".into(),
            base_revenue: dec!(1000),
            revenue_growth_rates: vec![dec!(0.10), dec!(0.09), dec!(0.08), dec!(0.07), dec!(0.06)],
            ebitda_margin: dec!(0.25),
            tax_rate: dec!(0.25),
            cash_flow: CashFlowModel::Standard {
                capex: Driver::PctOfRevenue(dec!(0.05)),
                depreciation: Driver::PctOfRevenue(dec!(0.03)),
                working_capital: Driver::PctOfRevenue(dec!(0.10)),
            },
            wacc: dec!(0.10),
            terminal_growth_rate: dec!(0.025),
            forecast_years: 5,
            exit_multiple: dec!(10),
        }
    }

    #[test]
    fn test_year1_standard_bridge() {
        let projections = project_cash_flows(&sample_assumptions()).unwrap();
        let y1 = &projections[0];

        // Revenue = 1000 * 1.10 = 1100
        assert_eq!(y1.revenue, dec!(1100));
        // EBITDA = 1100 * 0.25 = 275
        assert_eq!(y1.ebitda, dec!(275));
        // Tax = 275 * 0.25 = 68.75
        assert_eq!(y1.tax, dec!(68.75));
        // Capex = 55, D&A = 33, NWC change = 100 * 0.10 = 10
        assert_eq!(y1.capex, dec!(55));
        assert_eq!(y1.depreciation, dec!(33));
        assert_eq!(y1.working_capital_change, dec!(10));
        // FCF = 275 - 68.75 - 55 + 33 - 10 = 174.25
        assert_eq!(y1.free_cash_flow, dec!(174.25));
        assert!((y1.present_value - dec!(174.25) / dec!(1.1)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_year1_nopat_bridge() {
        let mut a = sample_assumptions();
        a.cash_flow = CashFlowModel::Nopat {
            capex: Driver::PctOfRevenue(dec!(0.05)),
            depreciation: Driver::PctOfRevenue(dec!(0.03)),
            working_capital: Driver::PctOfRevenue(dec!(0.10)),
        };
        let y1 = &project_cash_flows(&a).unwrap()[0];
        // EBIT = 275 - 33 = 242; NOPAT = 181.5; FCF = 181.5 + 33 - 55 - 10 = 149.5
        assert_eq!(y1.tax, dec!(60.5));
        assert_eq!(y1.free_cash_flow, dec!(149.5));
    }

    #[test]
    fn test_year1_reinvestment_bridge() {
        let mut a = sample_assumptions();
        a.cash_flow = CashFlowModel::Reinvestment {
            reinvestment_rate: dec!(0.20),
        };
        let y1 = &project_cash_flows(&a).unwrap()[0];
        // FCF = 275 * 0.8 = 220
        assert_eq!(y1.reinvestment, dec!(55));
        assert_eq!(y1.free_cash_flow, dec!(220));
        assert_eq!(y1.tax, Decimal::ZERO);
    }

    #[test]
    fn test_fixed_drivers() {
        let mut a = sample_assumptions();
        a.cash_flow = CashFlowModel::Standard {
            capex: Driver::Fixed(dec!(40)),
            depreciation: Driver::Fixed(dec!(20)),
            working_capital: Driver::Fixed(dec!(5)),
        };
        let y1 = &project_cash_flows(&a).unwrap()[0];
        // 275 - 68.75 - 40 + 20 - 5 = 181.25
        assert_eq!(y1.free_cash_flow, dec!(181.25));
    }

    #[test]
    fn test_projection_count_and_order() {
        let projections = project_cash_flows(&sample_assumptions()).unwrap();
        assert_eq!(projections.len(), 5);
        for pair in projections.windows(2) {
            assert!(pair[0].year < pair[1].year);
            assert!(pair[0].discount_factor > pair[1].discount_factor);
        }
    }

    #[test]
    fn test_dcf_enterprise_value_sum() {
        let result = dcf_valuation(&sample_assumptions()).unwrap();
        let pv_sum: Money = result.projections.iter().map(|p| p.present_value).sum();
        assert_eq!(result.pv_of_fcf, pv_sum);
        assert_eq!(result.enterprise_value, pv_sum + result.pv_of_terminal);
        assert!(result.multiples.is_none());
        assert!(result.reconciliation.is_none());
    }

    #[test]
    fn test_terminal_value_discounted_at_horizon() {
        let result = dcf_valuation(&sample_assumptions()).unwrap();
        let last = result.exit_year().unwrap();
        assert_eq!(result.terminal_discount_factor, last.discount_factor);
        let expected_tv = last.free_cash_flow * dec!(1.025) / dec!(0.075);
        assert_eq!(result.terminal_value, expected_tv);
        assert_eq!(result.pv_of_terminal, expected_tv * last.discount_factor);
    }

    #[test]
    fn test_terminal_value_divergent() {
        for (wacc, g) in [(dec!(0.05), dec!(0.05)), (dec!(0.04), dec!(0.06))] {
            let err = terminal_value(dec!(100), wacc, g).unwrap_err();
            assert!(matches!(err, ValuationError::DivergentModel { .. }));
        }
    }

    #[test]
    fn test_dcf_growth_exceeds_wacc() {
        let mut a = sample_assumptions();
        a.terminal_growth_rate = dec!(0.12);
        let err = dcf_valuation(&a).unwrap_err();
        assert!(err.to_string().contains("WACC"));
    }

    #[test]
    fn test_long_horizon_overflow_is_an_error() {
        let a = Assumptions {
            base_revenue: dec!(100),
            revenue_growth_rates: vec![dec!(0.10)],
            forecast_years: 800,
            ..sample_assumptions()
        };
        let err = dcf_valuation(&a).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
        assert!(err.to_string().contains("representable decimal range"));

        let max_horizon = Assumptions {
            forecast_years: i32::MAX,
            ..a
        };
        assert!(matches!(
            dcf_valuation(&max_horizon),
            Err(ValuationError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_huge_fixed_capex_is_an_error() {
        let mut a = sample_assumptions();
        a.cash_flow = CashFlowModel::Standard {
            capex: Driver::Fixed(Decimal::MAX),
            depreciation: Driver::PctOfRevenue(dec!(0.03)),
            working_capital: Driver::Fixed(Decimal::MAX),
        };
        assert!(matches!(
            project_cash_flows(&a),
            Err(ValuationError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_dcf_zero_wacc_rejected() {
        let mut a = sample_assumptions();
        a.wacc = Decimal::ZERO;
        assert!(matches!(
            dcf_valuation(&a),
            Err(ValuationError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_calculate_dcf_envelope() {
        let out = calculate_dcf(&sample_assumptions()).unwrap();
        assert!(out.methodology.contains("Gordon"));
        assert_eq!(out.assumptions["forecast_years"], 5);
        assert!(out.result.terminal_value_pct > Decimal::ZERO);
        assert!(out.result.terminal_value_pct < Decimal::ONE);
    }

    #[test]
    fn test_high_terminal_share_warns() {
        let mut a = sample_assumptions();
        a.terminal_growth_rate = dec!(0.09);
        let out = calculate_dcf(&a).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Terminal value represents")));
    }
}
