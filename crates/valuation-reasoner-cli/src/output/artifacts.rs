use std::fs;
use std::path::{Path, PathBuf};

use valuation_reasoner_core::narrative::format::money;
use valuation_reasoner_core::scenarios::{GridCell, SensitivityGrid};
use valuation_reasoner_core::valuation::{MultiplesReport, ValuationResult};
use valuation_reasoner_core::{ComputationOutput, ValuationError};

pub const DCF_OUTPUT: &str = "valuation_output_dcf.json";
pub const MULTIPLES_OUTPUT: &str = "valuation_output_multiples.json";
pub const DCF_EXPLANATION: &str = "valuation_explanation_dcf.txt";
pub const MULTIPLES_EXPLANATION: &str = "valuation_explanation_multiples.txt";
pub const SENSITIVITY_GRID: &str = "sensitivity_grid.csv";
pub const README: &str = "README_valuation.txt";

const README_TEXT: &str = "\
README - Valuation Reasoner

What it does:
 - Values a company two ways from one set of assumptions: a discounted cash
   flow (DCF) with a Gordon growth terminal value, and an EV/EBITDA exit
   multiple discounted to today.
 - Reconciles the two enterprise values and sweeps WACC against terminal
   growth to show how sensitive the DCF is to both.

Files written on every run (previous files are overwritten):
 - valuation_output_dcf.json          projections and DCF figures
 - valuation_output_multiples.json    multiples inputs, value and reconciliation
 - valuation_explanation_dcf.txt      step-by-step DCF walkthrough
 - valuation_explanation_multiples.txt  step-by-step multiples walkthrough
 - sensitivity_grid.csv               rows = WACC, columns = terminal growth
 - README_valuation.txt               this file

Reading the results:
 - Every number in the explanations traces back to an assumption or to an
   earlier step.
 - Grid cells marked 'divergent' have WACC at or below terminal growth; the
   Gordon growth model has no finite value there.
 - Grid cells marked 'invalid' pair rates the model cannot accept, such as a
   WACC at or below zero when the sweep runs past it.
 - A large gap between the DCF and multiples values usually means the growth
   and margin outlook and the chosen multiple tell different stories.

Supplying assumptions:
 - --assumptions <file.json|file.yaml>, or JSON piped on stdin.
 - --wacc, --terminal-growth, --exit-multiple and --years override single values.
 - With nothing supplied, built-in example assumptions are used.
";

/// Everything a full run writes, already computed.
pub struct ArtifactBundle {
    pub dcf: ComputationOutput<ValuationResult>,
    pub multiples: ComputationOutput<MultiplesReport>,
    pub dcf_explanation: String,
    pub multiples_explanation: String,
    pub sensitivity: ComputationOutput<SensitivityGrid>,
}

#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<ValuationError>,
}

/// Write every artifact into `dir`. Each file is attempted regardless of
/// whether an earlier one failed.
pub fn write_all(dir: &Path, bundle: &ArtifactBundle) -> WriteReport {
    let mut report = WriteReport::default();

    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "could not create output directory");
    }

    let attempts: [(&str, Result<Vec<u8>, ValuationError>); 6] = [
        (DCF_OUTPUT, to_pretty_json(&bundle.dcf)),
        (MULTIPLES_OUTPUT, to_pretty_json(&bundle.multiples)),
        (DCF_EXPLANATION, Ok(with_newline(&bundle.dcf_explanation))),
        (MULTIPLES_EXPLANATION, Ok(with_newline(&bundle.multiples_explanation))),
        (SENSITIVITY_GRID, grid_csv(&bundle.sensitivity.result)),
        (README, Ok(README_TEXT.as_bytes().to_vec())),
    ];

    for (name, contents) in attempts {
        let path = dir.join(name);
        match contents.and_then(|bytes| write_artifact(&path, name, &bytes)) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "wrote artifact");
                report.written.push(path);
            }
            Err(e) => {
                tracing::error!(artifact = name, error = %e, "artifact not written");
                report.failures.push(e);
            }
        }
    }

    report
}

/// Sensitivity grid as CSV: header row of terminal growth rates, one row per
/// WACC, cells rounded to cents, `divergent` or `invalid`.
pub fn grid_csv(grid: &SensitivityGrid) -> Result<Vec<u8>, ValuationError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["wacc \\ terminal_growth".to_string()];
    header.extend(grid.growth_rates.iter().map(|g| g.to_string()));
    wtr.write_record(&header).map_err(csv_failure)?;

    for (rate, row) in grid.discount_rates.iter().zip(&grid.cells) {
        let mut record = vec![rate.to_string()];
        record.extend(row.iter().map(|cell| match cell {
            GridCell::EnterpriseValue(v) => money(*v).replace(',', ""),
            GridCell::Divergent => "divergent".to_string(),
            GridCell::Invalid => "invalid".to_string(),
        }));
        wtr.write_record(&record).map_err(csv_failure)?;
    }

    wtr.into_inner().map_err(|e| ValuationError::IoFailure {
        artifact: SENSITIVITY_GRID.into(),
        reason: e.to_string(),
    })
}

fn csv_failure(e: csv::Error) -> ValuationError {
    ValuationError::IoFailure {
        artifact: SENSITIVITY_GRID.into(),
        reason: e.to_string(),
    }
}

fn to_pretty_json(value: &impl serde::Serialize) -> Result<Vec<u8>, ValuationError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn with_newline(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(b'\n');
    bytes
}

fn write_artifact(path: &Path, name: &str, bytes: &[u8]) -> Result<(), ValuationError> {
    fs::write(path, bytes).map_err(|e| ValuationError::IoFailure {
        artifact: name.to_string(),
        reason: e.to_string(),
    })
}
