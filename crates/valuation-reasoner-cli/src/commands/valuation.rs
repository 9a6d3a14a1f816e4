use serde_json::{json, Value};
use std::path::Path;

use valuation_reasoner_core::narrative::{explain, explain_multiples};
use valuation_reasoner_core::scenarios::calculate_sensitivity;
use valuation_reasoner_core::valuation::dcf::calculate_dcf;
use valuation_reasoner_core::valuation::{calculate_multiples, value_company};
use valuation_reasoner_core::ValuationError;

use super::sensitivity::SweepArgs;
use super::AssumptionArgs;
use crate::output::artifacts::{self, ArtifactBundle};

/// Result of a full run: a summary for stdout and any artifacts that could
/// not be written.
pub struct RunOutcome {
    pub summary: Value,
    pub failures: Vec<ValuationError>,
}

/// Process exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Computation or configuration error; nothing was written
    Failed,
    /// Computed, but at least one artifact could not be written
    ArtifactsIncomplete,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failed => 1,
            ExitStatus::ArtifactsIncomplete => 2,
        }
    }

    pub fn of_run<E>(result: &Result<RunOutcome, E>) -> Self {
        match result {
            Ok(outcome) if outcome.failures.is_empty() => ExitStatus::Success,
            Ok(_) => ExitStatus::ArtifactsIncomplete,
            Err(_) => ExitStatus::Failed,
        }
    }
}

pub fn run_dcf(source: &AssumptionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = super::load_assumptions(source)?;
    let result = calculate_dcf(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_multiples(source: &AssumptionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = super::load_assumptions(source)?;
    let result = value_company(&assumptions)?;
    Ok(serde_json::to_value(calculate_multiples(&result)?)?)
}

pub fn run_explain(source: &AssumptionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = super::load_assumptions(source)?;
    let result = value_company(&assumptions)?;
    Ok(Value::String(format!(
        "{}\n\n{}",
        explain(&result),
        explain_multiples(&result)
    )))
}

/// Compute everything, then write every artifact. Computation errors abort
/// before anything is written; write failures are collected per artifact.
pub fn run_all(
    source: &AssumptionArgs,
    sweep: &SweepArgs,
    out_dir: &Path,
) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let assumptions = super::load_assumptions(source)?;

    let result = value_company(&assumptions)?;
    let bundle = ArtifactBundle {
        dcf: calculate_dcf(&assumptions)?,
        multiples: calculate_multiples(&result)?,
        dcf_explanation: explain(&result),
        multiples_explanation: explain_multiples(&result),
        sensitivity: calculate_sensitivity(&assumptions, &sweep.spec())?,
    };

    let report = artifacts::write_all(out_dir, &bundle);

    let reconciliation = &bundle.multiples.result.reconciliation;
    let summary = json!({
        "result": {
            "company": assumptions.company_name,
            "dcf_enterprise_value": result.enterprise_value.round_dp(2),
            "multiples_enterprise_value": bundle.multiples.result.valuation.enterprise_value.round_dp(2),
            "absolute_difference": reconciliation.absolute_difference.round_dp(2),
            "percentage_difference": reconciliation.percentage_difference.round_dp(2),
            "sensitivity_cells": bundle.sensitivity.result.len(),
            "divergent_cells": bundle.sensitivity.result.divergent_cells,
            "invalid_cells": bundle.sensitivity.result.invalid_cells,
            "artifacts_written": report.written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        },
        "methodology": bundle.dcf.methodology,
        "warnings": bundle
            .dcf
            .warnings
            .iter()
            .chain(bundle.multiples.warnings.iter())
            .chain(bundle.sensitivity.warnings.iter())
            .collect::<Vec<_>>(),
    });

    Ok(RunOutcome {
        summary,
        failures: report.failures,
    })
}
