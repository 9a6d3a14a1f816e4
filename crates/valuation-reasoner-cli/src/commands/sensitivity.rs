use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use valuation_reasoner_core::scenarios::{calculate_sensitivity, SweepSpec};

use super::AssumptionArgs;

/// Shape of the WACC x terminal growth sweep around the base case
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// WACC step between grid rows
    #[arg(long, global = true, default_value = "0.01")]
    pub wacc_step: Decimal,

    /// Terminal growth step between grid columns
    #[arg(long, global = true, default_value = "0.005")]
    pub growth_step: Decimal,

    /// Steps on each side of the base case (grid is 2n+1 square)
    #[arg(long, global = true, default_value_t = 2)]
    pub steps: u32,
}

impl SweepArgs {
    pub fn spec(&self) -> SweepSpec {
        SweepSpec {
            wacc_step: self.wacc_step,
            growth_step: self.growth_step,
            steps_each_side: self.steps,
        }
    }
}

pub fn run_sensitivity(
    source: &AssumptionArgs,
    sweep: &SweepArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = super::load_assumptions(source)?;
    let result = calculate_sensitivity(&assumptions, &sweep.spec())?;
    Ok(serde_json::to_value(result)?)
}
