//! Plain-text walkthroughs of a computed valuation.
//!
//! Everything here is presentation over an existing `ValuationResult`; no
//! figure is recomputed, only formatted.

pub mod format;

use crate::valuation::{Assumptions, CashFlowModel, Reconciliation, ValuationResult};

use format::{driver, factor, money, multiple, pct, pct_points};

/// Step-by-step explanation of the DCF path, ending with the reconciliation
/// outcome when the result carries one.
pub fn explain(result: &ValuationResult) -> String {
    let a = &result.assumptions;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "Valuation of {}: Discounted Cash Flow (DCF) with a Gordon growth terminal value.",
        a.company_name
    ));
    lines.push(String::new());
    restate_assumptions(a, &mut lines);

    lines.push(String::new());
    lines.push("Step 1 - Revenue and EBITDA projections:".into());
    for p in &result.projections {
        lines.push(format!(
            " Year {}: revenue grows {} to {}; EBITDA at {} margin = {}.",
            p.year,
            pct(p.growth_rate),
            money(p.revenue),
            pct(a.ebitda_margin),
            money(p.ebitda)
        ));
    }

    lines.push(String::new());
    lines.push("Step 2 - Free cash flow (FCF):".into());
    lines.push(format!(" {}.", a.cash_flow.formula()));
    for p in &result.projections {
        let line = match &a.cash_flow {
            CashFlowModel::Standard { .. } => format!(
                " Year {}: FCF = {} - tax {} - capex {} + depreciation {} - change in working capital {} = {}.",
                p.year,
                money(p.ebitda),
                money(p.tax),
                money(p.capex),
                money(p.depreciation),
                money(p.working_capital_change),
                money(p.free_cash_flow)
            ),
            CashFlowModel::Nopat { .. } => format!(
                " Year {}: FCF = EBITDA {} - tax on EBIT {} + depreciation {} - capex {} - change in working capital {} = {} (depreciation netted out of EBIT and added back).",
                p.year,
                money(p.ebitda),
                money(p.tax),
                money(p.depreciation),
                money(p.capex),
                money(p.working_capital_change),
                money(p.free_cash_flow)
            ),
            CashFlowModel::Reinvestment { .. } => format!(
                " Year {}: FCF = {} - reinvested {} = {}.",
                p.year,
                money(p.ebitda),
                money(p.reinvestment),
                money(p.free_cash_flow)
            ),
        };
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("Step 3 - Discount projected FCFs:".into());
    lines.push(format!(
        " Each FCF is discounted at WACC = {} using discount factor = 1 / (1 + WACC)^year.",
        pct(a.wacc)
    ));
    for p in &result.projections {
        lines.push(format!(
            " Year {}: {} x discount factor {} = present value {}.",
            p.year,
            money(p.free_cash_flow),
            factor(p.discount_factor),
            money(p.present_value)
        ));
    }

    lines.push(String::new());
    lines.push("Step 4 - Terminal value (Gordon growth):".into());
    lines.push(" TV = last FCF x (1 + terminal growth) / (WACC - terminal growth)".into());
    if let Some(last) = result.exit_year() {
        lines.push(format!(
            " Last FCF = {}; terminal growth = {}; WACC = {}.",
            money(last.free_cash_flow),
            pct(a.terminal_growth_rate),
            pct(a.wacc)
        ));
    }
    lines.push(format!(" Terminal value (undiscounted) = {}.", money(result.terminal_value)));
    lines.push(format!(
        " Discounted with the year-{} factor {}: PV(TV) = {}.",
        a.forecast_years,
        factor(result.terminal_discount_factor),
        money(result.pv_of_terminal)
    ));
    lines.push(format!(
        " The terminal value implies an exit multiple of {} EBITDA.",
        multiple(result.implied_exit_multiple)
    ));

    lines.push(String::new());
    lines.push("Step 5 - Enterprise value:".into());
    lines.push(format!(" Sum of discounted FCFs = {}.", money(result.pv_of_fcf)));
    lines.push(format!(" PV(terminal value) = {}.", money(result.pv_of_terminal)));
    lines.push(format!(
        " Enterprise value = {} + {} = {}.",
        money(result.pv_of_fcf),
        money(result.pv_of_terminal),
        money(result.enterprise_value)
    ));
    lines.push(format!(
        " The terminal value accounts for {} of enterprise value.",
        pct(result.terminal_value_pct)
    ));

    if result.multiples.is_some() || result.reconciliation.is_some() {
        lines.push(String::new());
        lines.push("Step 6 - Reconciliation with the multiples method:".into());
        if let Some(m) = &result.multiples {
            lines.push(format!(
                " Year {} EBITDA {} x {} = exit value {}; x discount factor {} = multiples enterprise value {}.",
                m.exit_year,
                money(m.exit_year_ebitda),
                multiple(m.multiple),
                money(m.undiscounted_value),
                factor(m.discount_factor),
                money(m.enterprise_value)
            ));
        }
        if let Some(rec) = &result.reconciliation {
            describe_reconciliation(rec, &mut lines);
        }
    }

    lines.push(String::new());
    lines.push("Notes and caveats:".into());
    lines.push(
        " - Terminal value is sensitive to terminal growth and WACC; terminal growth must stay below WACC and should be economically plausible."
            .into(),
    );
    if matches!(a.cash_flow, CashFlowModel::Reinvestment { .. }) {
        lines.push(
            " - The reinvestment model folds tax, capex and working capital into a single rate; model them separately for a fuller view."
                .into(),
        );
    }

    lines.join("\n")
}

/// Explanation of the EV/EBITDA path.
pub fn explain_multiples(result: &ValuationResult) -> String {
    let a = &result.assumptions;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "Valuation of {}: EV/EBITDA exit multiple, discounted to today.",
        a.company_name
    ));
    lines.push(String::new());

    let Some(m) = &result.multiples else {
        lines.push("The multiples valuation was not computed for this run.".into());
        return lines.join("\n");
    };

    lines.push("Step 1 - Exit-year EBITDA:".into());
    lines.push(format!(
        " Year {} EBITDA from the revenue projection = {}.",
        m.exit_year,
        money(m.exit_year_ebitda)
    ));
    lines.push(String::new());
    lines.push("Step 2 - Apply the exit multiple:".into());
    lines.push(format!(
        " Exit value = {} x {} = {}.",
        money(m.exit_year_ebitda),
        multiple(m.multiple),
        money(m.undiscounted_value)
    ));
    lines.push(String::new());
    lines.push("Step 3 - Discount to present:".into());
    lines.push(format!(
        " Using WACC = {} over {} years, discount factor = {}.",
        pct(a.wacc),
        m.exit_year,
        factor(m.discount_factor)
    ));
    lines.push(format!(
        " Enterprise value = {} x {} = {}.",
        money(m.undiscounted_value),
        factor(m.discount_factor),
        money(m.enterprise_value)
    ));
    lines.push(" Only EBITDA enters this method; free cash flow and terminal growth play no part.".into());

    if let Some(rec) = &result.reconciliation {
        lines.push(String::new());
        lines.push("Step 4 - Reconciliation with the DCF method:".into());
        describe_reconciliation(rec, &mut lines);
    }

    lines.join("\n")
}

fn restate_assumptions(a: &Assumptions, lines: &mut Vec<String>) {
    lines.push("Assumptions:".into());
    lines.push(format!(" Base revenue: {}", money(a.base_revenue)));
    let growth: Vec<String> = a.revenue_growth_rates.iter().map(|g| pct(*g)).collect();
    lines.push(format!(
        " Revenue growth by year: {} (last rate carries forward)",
        growth.join(", ")
    ));
    lines.push(format!(" EBITDA margin: {}", pct(a.ebitda_margin)));
    lines.push(format!(" Tax rate: {}", pct(a.tax_rate)));
    match &a.cash_flow {
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
            lines.push(format!(" Capex: {}", driver(capex)));
            lines.push(format!(" Depreciation: {}", driver(depreciation)));
            lines.push(format!(" Working capital: {}", driver(working_capital)));
        }
        CashFlowModel::Reinvestment { reinvestment_rate } => {
            lines.push(format!(" Reinvestment rate: {}", pct(*reinvestment_rate)));
        }
    }
    lines.push(format!(" WACC: {}", pct(a.wacc)));
    lines.push(format!(" Terminal growth rate: {}", pct(a.terminal_growth_rate)));
    lines.push(format!(" Forecast horizon: {} years", a.forecast_years));
    lines.push(format!(" Exit EV/EBITDA multiple: {}", multiple(a.exit_multiple)));
}

fn describe_reconciliation(rec: &Reconciliation, lines: &mut Vec<String>) {
    lines.push(format!(" DCF enterprise value = {}.", money(rec.dcf_value)));
    lines.push(format!(" Multiples enterprise value = {}.", money(rec.multiples_value)));
    lines.push(format!(
        " Difference = {} ({} of the multiples value).",
        money(rec.absolute_difference),
        pct_points(rec.percentage_difference)
    ));

    let verdict = if rec.percentage_difference.is_zero() {
        "The two methods agree exactly.".to_string()
    } else if rec.percentage_difference.is_sign_positive() {
        format!(
            "The DCF value is {} above the multiples value; the cash-flow outlook is more optimistic than the exit multiple implies.",
            pct_points(rec.percentage_difference.abs())
        )
    } else {
        format!(
            "The DCF value is {} below the multiples value; the exit multiple prices in more than the projected cash flows support.",
            pct_points(rec.percentage_difference.abs())
        )
    };
    lines.push(format!(" {verdict}"));
}
