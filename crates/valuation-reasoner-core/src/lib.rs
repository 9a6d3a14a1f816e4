pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "narrative")]
pub mod narrative;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationOutcome<T> = Result<T, ValuationError>;
