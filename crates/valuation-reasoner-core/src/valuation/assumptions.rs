use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{Money, Multiple, Rate};
use crate::ValuationOutcome;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A cash-flow line item expressed either relative to revenue or as a flat
/// amount per forecast year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    PctOfRevenue(Rate),
    Fixed(Money),
}

impl Driver {
    /// Amount of this item in a year with the given revenue. `None` when the
    /// amount leaves the decimal range.
    pub fn amount(&self, revenue: Money) -> Option<Money> {
        match *self {
            Driver::PctOfRevenue(pct) => revenue.checked_mul(pct),
            Driver::Fixed(amount) => Some(amount),
        }
    }

    /// Year-on-year change in working capital.
    ///
    /// A percentage driver describes the NWC balance, so the change is the
    /// percentage applied to incremental revenue. A fixed driver is the
    /// change itself.
    pub fn working_capital_change(&self, revenue: Money, prev_revenue: Money) -> Option<Money> {
        match *self {
            Driver::PctOfRevenue(pct) => revenue.checked_sub(prev_revenue)?.checked_mul(pct),
            Driver::Fixed(delta) => Some(delta),
        }
    }
}

/// How free cash flow is derived from each year's EBITDA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CashFlowModel {
    /// FCF = EBITDA * (1 - tax) - capex + depreciation - change in NWC
    Standard {
        capex: Driver,
        depreciation: Driver,
        working_capital: Driver,
    },
    /// FCF = (EBITDA - D&A) * (1 - tax) + D&A - capex - change in NWC
    Nopat {
        capex: Driver,
        depreciation: Driver,
        working_capital: Driver,
    },
    /// FCF = EBITDA * (1 - reinvestment_rate); no tax, capex or NWC lines
    Reinvestment { reinvestment_rate: Rate },
}

impl CashFlowModel {
    pub fn formula(&self) -> &'static str {
        match self {
            CashFlowModel::Standard { .. } => {
                "FCF = EBITDA x (1 - tax rate) - capex + depreciation - change in working capital"
            }
            CashFlowModel::Nopat { .. } => {
                "FCF = (EBITDA - depreciation) x (1 - tax rate) + depreciation - capex - change in working capital"
            }
            CashFlowModel::Reinvestment { .. } => "FCF = EBITDA x (1 - reinvestment rate)",
        }
    }
}

impl Default for CashFlowModel {
    fn default() -> Self {
        CashFlowModel::Standard {
            capex: Driver::PctOfRevenue(dec!(0.04)),
            depreciation: Driver::PctOfRevenue(dec!(0.03)),
            working_capital: Driver::PctOfRevenue(dec!(0.10)),
        }
    }
}

/// Every input the valuation needs. Built once per run and never mutated by
/// the engine; sensitivity sweeps work on clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    /// Label used in narratives and artifacts
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// Most recent (year 0) revenue
    pub base_revenue: Money,
    /// Year-by-year revenue growth; the last rate carries forward when the
    /// list is shorter than `forecast_years`
    pub revenue_growth_rates: Vec<Rate>,
    /// EBITDA as a fraction of revenue
    pub ebitda_margin: Rate,
    /// Tax rate on operating profit
    pub tax_rate: Rate,
    /// Free cash flow derivation
    #[serde(default)]
    pub cash_flow: CashFlowModel,
    /// Weighted average cost of capital (discount rate)
    pub wacc: Rate,
    /// Perpetual growth rate after the explicit forecast
    pub terminal_growth_rate: Rate,
    /// Number of explicit forecast years
    pub forecast_years: i32,
    /// EV/EBITDA multiple applied to exit-year EBITDA
    pub exit_multiple: Multiple,
}

fn default_company_name() -> String {
    "Target Co".to_string()
}

impl Default for Assumptions {
    fn default() -> Self {
        Assumptions {
            company_name: default_company_name(),
            base_revenue: dec!(100_000_000),
            revenue_growth_rates: vec![dec!(0.20), dec!(0.15), dec!(0.12), dec!(0.10), dec!(0.08)],
            ebitda_margin: dec!(0.18),
            tax_rate: dec!(0.25),
            cash_flow: CashFlowModel::default(),
            wacc: dec!(0.10),
            terminal_growth_rate: dec!(0.03),
            forecast_years: 5,
            exit_multiple: dec!(8),
        }
    }
}

impl Assumptions {
    /// Horizon as an unsigned year count. Only meaningful after `validate`.
    pub fn horizon(&self) -> u32 {
        self.forecast_years.max(0) as u32
    }

    /// Growth rate applied in `year` (1-based).
    pub fn growth_for_year(&self, year: u32) -> Rate {
        let idx = year.saturating_sub(1) as usize;
        self.revenue_growth_rates
            .get(idx)
            .or_else(|| self.revenue_growth_rates.last())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Same assumptions with the discount rate and terminal growth swapped out.
    pub fn with_rates(&self, wacc: Rate, terminal_growth_rate: Rate) -> Assumptions {
        Assumptions {
            wacc,
            terminal_growth_rate,
            ..self.clone()
        }
    }

    /// Range checks that do not involve the terminal growth rate. The
    /// `wacc > g` precondition is enforced separately where the terminal
    /// value is computed.
    pub fn validate(&self) -> ValuationOutcome<()> {
        if self.forecast_years < 1 {
            return Err(ValuationError::invalid(
                "forecast_years",
                format!("Forecast horizon must be at least 1 year, got {}", self.forecast_years),
            ));
        }
        if self.wacc <= Decimal::ZERO {
            return Err(ValuationError::invalid("wacc", "WACC must be positive"));
        }
        if self.base_revenue <= Decimal::ZERO {
            return Err(ValuationError::invalid("base_revenue", "Base revenue must be positive"));
        }
        if self.revenue_growth_rates.is_empty() {
            return Err(ValuationError::invalid(
                "revenue_growth_rates",
                "At least one growth rate is required",
            ));
        }
        if let Some((i, g)) = self
            .revenue_growth_rates
            .iter()
            .enumerate()
            .find(|(_, g)| **g <= -Decimal::ONE)
        {
            return Err(ValuationError::invalid(
                "revenue_growth_rates",
                format!("Growth rate {g} for year {} would make revenue zero or negative", i + 1),
            ));
        }
        if self.ebitda_margin < Decimal::ZERO || self.ebitda_margin >= Decimal::ONE {
            return Err(ValuationError::invalid(
                "ebitda_margin",
                "EBITDA margin must be in [0, 1)",
            ));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ValuationError::invalid("tax_rate", "Tax rate must be between 0 and 1"));
        }
        if self.exit_multiple < Decimal::ZERO {
            return Err(ValuationError::invalid(
                "exit_multiple",
                "Exit multiple cannot be negative",
            ));
        }
        self.validate_cash_flow_model()
    }

    fn validate_cash_flow_model(&self) -> ValuationOutcome<()> {
        match &self.cash_flow {
            CashFlowModel::Standard {
                capex,
                depreciation,
                working_capital,
            }
            | CashFlowModel::Nopat {
                capex,
                depreciation,
                working_capital,
            } => {
                for (field, driver) in [
                    ("cash_flow.capex", capex),
                    ("cash_flow.depreciation", depreciation),
                ] {
                    let negative = match driver {
                        Driver::PctOfRevenue(v) | Driver::Fixed(v) => *v < Decimal::ZERO,
                    };
                    if negative {
                        return Err(ValuationError::invalid(field, "Cannot be negative"));
                    }
                }
                if let Driver::PctOfRevenue(pct) = working_capital {
                    if *pct < Decimal::ZERO {
                        return Err(ValuationError::invalid(
                            "cash_flow.working_capital",
                            "Working capital as % of revenue cannot be negative",
                        ));
                    }
                }
                Ok(())
            }
            CashFlowModel::Reinvestment { reinvestment_rate } => {
                if *reinvestment_rate < Decimal::ZERO || *reinvestment_rate > Decimal::ONE {
                    return Err(ValuationError::invalid(
                        "cash_flow.reinvestment_rate",
                        "Reinvestment rate must be between 0 and 1",
                    ));
                }
                Ok(())
            }
        }
    }
}
