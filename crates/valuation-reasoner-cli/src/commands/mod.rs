pub mod sensitivity;
pub mod valuation;

use clap::Args;
use rust_decimal::Decimal;

use valuation_reasoner_core::valuation::Assumptions;

use crate::input;

/// Where the assumptions come from, plus individual overrides
#[derive(Args, Debug, Default)]
pub struct AssumptionArgs {
    /// Path to a JSON or YAML assumptions file
    #[arg(long, global = true)]
    pub assumptions: Option<String>,

    /// Override the discount rate (WACC), e.g. 0.095
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub wacc: Option<Decimal>,

    /// Override the terminal growth rate, e.g. 0.025
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub terminal_growth: Option<Decimal>,

    /// Override the exit EV/EBITDA multiple
    #[arg(long, global = true)]
    pub exit_multiple: Option<Decimal>,

    /// Override the forecast horizon in years
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub years: Option<i32>,
}

/// Resolve assumptions: file, then piped stdin, then built-in defaults,
/// with flag overrides applied last.
pub fn load_assumptions(args: &AssumptionArgs) -> Result<Assumptions, Box<dyn std::error::Error>> {
    let mut assumptions: Assumptions = if let Some(ref path) = args.assumptions {
        input::file::read_config(path)?
    } else if let Some(from_stdin) = input::stdin::read_stdin()? {
        from_stdin
    } else {
        tracing::info!("no assumptions supplied; using built-in defaults");
        Assumptions::default()
    };

    apply_overrides(&mut assumptions, args);
    Ok(assumptions)
}

fn apply_overrides(assumptions: &mut Assumptions, args: &AssumptionArgs) {
    if let Some(wacc) = args.wacc {
        assumptions.wacc = wacc;
    }
    if let Some(g) = args.terminal_growth {
        assumptions.terminal_growth_rate = g;
    }
    if let Some(m) = args.exit_multiple {
        assumptions.exit_multiple = m;
    }
    if let Some(years) = args.years {
        assumptions.forecast_years = years;
    }
}
