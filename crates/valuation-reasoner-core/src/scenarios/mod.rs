pub mod sensitivity;

pub use sensitivity::{
    base_case_grid, calculate_sensitivity, centered_sweep, sensitivity_grid, sweep, GridCell,
    SensitivityGrid, SweepSpec,
};
