use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::types::*;
use crate::valuation::{dcf_valuation, Assumptions};
use crate::ValuationOutcome;

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridCell {
    EnterpriseValue(Money),
    /// WACC <= terminal growth; the Gordon growth model has no finite value
    Divergent,
    /// The pair puts the model outside its input domain (WACC <= 0, or a
    /// value beyond the decimal range)
    Invalid,
}

impl GridCell {
    pub fn value(&self) -> Option<Money> {
        match self {
            GridCell::EnterpriseValue(v) => Some(*v),
            GridCell::Divergent | GridCell::Invalid => None,
        }
    }
}

/// Enterprise value across (discount rate, terminal growth) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub discount_rates: Vec<Rate>,
    pub growth_rates: Vec<Rate>,
    /// cells[i][j] = EV at discount_rates[i], growth_rates[j]
    pub cells: Vec<Vec<GridCell>>,
    /// (row, col) of the pair closest to the base-case assumptions
    pub base_case_position: (usize, usize),
    pub computed_cells: usize,
    pub divergent_cells: usize,
    pub invalid_cells: usize,
}

impl SensitivityGrid {
    pub fn get(&self, wacc: Rate, growth: Rate) -> Option<&GridCell> {
        let row = self.discount_rates.iter().position(|r| *r == wacc)?;
        let col = self.growth_rates.iter().position(|g| *g == growth)?;
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn len(&self) -> usize {
        self.discount_rates.len() * self.growth_rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape of a sweep centred on the base case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSpec {
    pub wacc_step: Rate,
    pub growth_step: Rate,
    pub steps_each_side: u32,
}

impl Default for SweepSpec {
    fn default() -> Self {
        SweepSpec {
            wacc_step: dec!(0.01),
            growth_step: dec!(0.005),
            steps_each_side: 2,
        }
    }
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
pub fn sweep(var: &SensitivityVariable) -> ValuationOutcome<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ValuationError::InvalidAssumption {
            field: format!("sweep:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ValuationError::InvalidAssumption {
            field: format!("sweep:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Include max when the step does not land on it exactly
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// `2 * steps_each_side + 1` evenly spaced values centred on `base`.
pub fn centered_sweep(name: &str, base: Rate, step: Rate, steps_each_side: u32) -> ValuationOutcome<Vec<Rate>> {
    let span = step * Decimal::from(steps_each_side);
    sweep(&SensitivityVariable {
        name: name.to_string(),
        min: base - span,
        max: base + span,
        step,
    })
}

/// Recompute the DCF for every (WACC, terminal growth) pair, holding every
/// other assumption fixed. Pairs with WACC <= growth are marked divergent
/// instead of being computed; pairs the model rejects as inputs are marked
/// invalid. Neither stops the sweep.
pub fn sensitivity_grid(
    assumptions: &Assumptions,
    discount_rates: &[Rate],
    growth_rates: &[Rate],
) -> ValuationOutcome<SensitivityGrid> {
    if discount_rates.is_empty() || growth_rates.is_empty() {
        return Err(ValuationError::invalid(
            "sensitivity",
            "Both discount rate and growth rate ranges need at least one value",
        ));
    }

    let mut cells = Vec::with_capacity(discount_rates.len());
    let mut computed_cells = 0;
    let mut divergent_cells = 0;
    let mut invalid_cells = 0;

    for &wacc in discount_rates {
        let mut row = Vec::with_capacity(growth_rates.len());
        for &growth in growth_rates {
            if wacc <= growth {
                tracing::debug!(%wacc, %growth, "skipping divergent sensitivity pair");
                divergent_cells += 1;
                row.push(GridCell::Divergent);
                continue;
            }
            match dcf_valuation(&assumptions.with_rates(wacc, growth)) {
                Ok(result) => {
                    computed_cells += 1;
                    row.push(GridCell::EnterpriseValue(result.enterprise_value));
                }
                Err(e @ ValuationError::InvalidAssumption { .. }) => {
                    tracing::debug!(%wacc, %growth, error = %e, "skipping invalid sensitivity pair");
                    invalid_cells += 1;
                    row.push(GridCell::Invalid);
                }
                Err(e) => return Err(e),
            }
        }
        cells.push(row);
    }

    let base_case_position = (
        closest_index(discount_rates, assumptions.wacc),
        closest_index(growth_rates, assumptions.terminal_growth_rate),
    );

    Ok(SensitivityGrid {
        discount_rates: discount_rates.to_vec(),
        growth_rates: growth_rates.to_vec(),
        cells,
        base_case_position,
        computed_cells,
        divergent_cells,
        invalid_cells,
    })
}

/// Grid centred on the base-case WACC and terminal growth.
pub fn base_case_grid(assumptions: &Assumptions, spec: &SweepSpec) -> ValuationOutcome<SensitivityGrid> {
    let rates = centered_sweep("wacc", assumptions.wacc, spec.wacc_step, spec.steps_each_side)?;
    let growths = centered_sweep(
        "terminal_growth_rate",
        assumptions.terminal_growth_rate,
        spec.growth_step,
        spec.steps_each_side,
    )?;
    sensitivity_grid(assumptions, &rates, &growths)
}

/// Base-case grid in the standard output envelope.
pub fn calculate_sensitivity(
    assumptions: &Assumptions,
    spec: &SweepSpec,
) -> ValuationOutcome<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let grid = base_case_grid(assumptions, spec)?;

    let mut warnings = Vec::new();
    if grid.divergent_cells > 0 {
        warnings.push(format!(
            "{} of {} pairs have WACC <= terminal growth and were not computed",
            grid.divergent_cells,
            grid.len()
        ));
    }
    if grid.invalid_cells > 0 {
        warnings.push(format!(
            "{} of {} pairs fall outside the valid input range (e.g. WACC <= 0) and were not computed",
            grid.invalid_cells,
            grid.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity: DCF enterprise value by WACC and terminal growth",
        spec,
        warnings,
        elapsed,
        grid,
    ))
}

/// Find the closest index to a target value.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assumptions() -> Assumptions {
        Assumptions {
            base_revenue: dec!(100),
            revenue_growth_rates: vec![dec!(0.10)],
            ebitda_margin: dec!(0.20),
            tax_rate: dec!(0.25),
            wacc: dec!(0.10),
            terminal_growth_rate: dec!(0.03),
            forecast_years: 5,
            exit_multiple: dec!(8),
            ..Assumptions::default()
        }
    }

    #[test]
    fn test_sweep_values() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(1),
            max: dec!(5),
            step: dec!(1),
        };
        assert_eq!(sweep(&var).unwrap(), vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = sweep(&var).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_step() {
        let var = SensitivityVariable {
            name: "bad".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0),
        };
        assert!(sweep(&var).is_err());
    }

    #[test]
    fn test_centered_sweep() {
        let vals = centered_sweep("wacc", dec!(0.10), dec!(0.01), 2).unwrap();
        assert_eq!(vals, vec![dec!(0.08), dec!(0.09), dec!(0.10), dec!(0.11), dec!(0.12)]);
    }

    #[test]
    fn test_grid_dimensions_and_base_case() {
        let grid = base_case_grid(&sample_assumptions(), &SweepSpec::default()).unwrap();
        assert_eq!(grid.cells.len(), 5);
        assert!(grid.cells.iter().all(|row| row.len() == 5));
        assert_eq!(grid.len(), 25);
        assert_eq!(grid.base_case_position, (2, 2));
        assert_eq!(grid.divergent_cells, 0);
        assert_eq!(grid.computed_cells, 25);
    }

    #[test]
    fn test_divergent_pairs_skipped() {
        let rates = [dec!(0.03), dec!(0.05), dec!(0.08)];
        let growths = [dec!(0.02), dec!(0.05)];
        let grid = sensitivity_grid(&sample_assumptions(), &rates, &growths).unwrap();

        assert_eq!(grid.divergent_cells, 2); // (0.03, 0.05) and (0.05, 0.05)
        assert_eq!(grid.computed_cells, 4);
        assert_eq!(grid.get(dec!(0.03), dec!(0.05)), Some(&GridCell::Divergent));
        assert_eq!(grid.get(dec!(0.05), dec!(0.05)), Some(&GridCell::Divergent));
        assert!(grid.get(dec!(0.08), dec!(0.05)).unwrap().value().is_some());
    }

    #[test]
    fn test_cells_match_independent_dcf() {
        let a = sample_assumptions();
        let rates = [dec!(0.09), dec!(0.11)];
        let growths = [dec!(0.02), dec!(0.04)];
        let grid = sensitivity_grid(&a, &rates, &growths).unwrap();
        for &w in &rates {
            for &g in &growths {
                let expected = dcf_valuation(&a.with_rates(w, g)).unwrap().enterprise_value;
                assert_eq!(grid.get(w, g).unwrap().value(), Some(expected));
            }
        }
    }

    #[test]
    fn test_low_base_wacc_marks_non_positive_rows_invalid() {
        let a = Assumptions {
            wacc: dec!(0.02),
            terminal_growth_rate: dec!(0.0),
            ..Assumptions::default()
        };
        let grid = base_case_grid(&a, &SweepSpec::default()).unwrap();

        // wacc 0.00..0.04, growth -0.010..0.010
        // wacc 0.00: g >= 0 divergent (3), g < 0 invalid (2); wacc 0.01: g 0.01 divergent
        assert_eq!(grid.invalid_cells, 2);
        assert_eq!(grid.divergent_cells, 4);
        assert_eq!(grid.computed_cells, 19);
        assert_eq!(grid.cells[0][0], GridCell::Invalid);
        assert_eq!(grid.cells[0][4], GridCell::Divergent);

        let (row, col) = grid.base_case_position;
        let base = dcf_valuation(&a).unwrap().enterprise_value;
        let cell = grid.cells[row][col].value().unwrap();
        assert!((cell - base).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_envelope_reports_invalid_pairs() {
        let a = Assumptions {
            wacc: dec!(0.02),
            terminal_growth_rate: dec!(0.0),
            ..Assumptions::default()
        };
        let out = calculate_sensitivity(&a, &SweepSpec::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("outside the valid input range")));
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(sensitivity_grid(&sample_assumptions(), &[], &[dec!(0.02)]).is_err());
    }

    #[test]
    fn test_envelope_reports_divergent_pairs() {
        let mut a = sample_assumptions();
        a.wacc = dec!(0.05);
        a.terminal_growth_rate = dec!(0.04);
        let spec = SweepSpec {
            wacc_step: dec!(0.01),
            growth_step: dec!(0.01),
            steps_each_side: 1,
        };
        let out = calculate_sensitivity(&a, &spec).unwrap();
        // wacc 0.04..0.06, growth 0.03..0.05: (0.04,0.04) (0.04,0.05) (0.05,0.05)
        assert_eq!(out.result.divergent_cells, 3);
        assert_eq!(out.warnings.len(), 1);
    }
}
