use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Invalid assumption: {field} — {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Divergent model: WACC ({wacc}) must exceed terminal growth rate ({terminal_growth}) for the Gordon growth model")]
    DivergentModel {
        wacc: Decimal,
        terminal_growth: Decimal,
    },

    #[error("Division by zero in {context}: result is not computable")]
    DivisionByZero { context: String },

    #[error("Failed to write {artifact}: {reason}")]
    IoFailure { artifact: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ValuationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidAssumption {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Arithmetic left the representable decimal range. Reported against the
    /// input that drove the value there.
    pub(crate) fn out_of_range(field: &str, what: impl std::fmt::Display) -> Self {
        ValuationError::invalid(
            field,
            format!("{what} exceeds the representable decimal range"),
        )
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::Serialization(e.to_string())
    }
}
