use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationOutcome;

/// End-of-period discount factor: 1 / (1 + rate)^period
pub fn discount_factor(rate: Rate, period: u32) -> ValuationOutcome<Rate> {
    if rate <= -Decimal::ONE {
        return Err(ValuationError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let compounded = (Decimal::ONE + rate)
        .checked_powu(u64::from(period))
        .ok_or_else(|| ValuationError::out_of_range("rate", format!("(1 + {rate})^{period}")))?;

    if compounded.is_zero() {
        return Err(ValuationError::DivisionByZero {
            context: format!("discount factor at period {period}"),
        });
    }

    Ok(Decimal::ONE / compounded)
}

/// Value at time t of a cash flow stream that pays `cash_flow * (1 + growth)` at
/// t+1 and keeps growing at `growth` forever.
///
/// The rate must strictly exceed the growth rate; the check happens before any
/// division so the caller never sees an infinite or negative perpetuity.
pub fn growing_perpetuity(cash_flow: Money, rate: Rate, growth: Rate) -> ValuationOutcome<Money> {
    let spread = rate - growth;
    if spread <= Decimal::ZERO {
        return Err(ValuationError::DivergentModel {
            wacc: rate,
            terminal_growth: growth,
        });
    }
    cash_flow
        .checked_mul(Decimal::ONE + growth)
        .and_then(|next| next.checked_div(spread))
        .ok_or_else(|| ValuationError::out_of_range("terminal_growth_rate", "Terminal value"))
}
