use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::valuation::Driver;

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Currency amount with thousands separators and two decimals: `-1,234.50`
pub fn money(value: Decimal) -> String {
    let rounded = round(value, 2);
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Decimal rate as a percentage: `0.035` -> `3.50%`
pub fn pct(rate: Decimal) -> String {
    format!("{:.2}%", round(rate * dec!(100), 2))
}

/// Value already expressed in percent: `12.5` -> `12.50%`
pub fn pct_points(value: Decimal) -> String {
    format!("{:.2}%", round(value, 2))
}

pub fn factor(value: Decimal) -> String {
    format!("{:.6}", round(value, 6))
}

pub fn multiple(value: Decimal) -> String {
    format!("{:.2}x", round(value, 2))
}

/// Cash-flow driver as restated in the assumptions block.
pub fn driver(d: &Driver) -> String {
    match *d {
        Driver::PctOfRevenue(rate) => format!("{} of revenue", pct(rate)),
        Driver::Fixed(amount) => format!("{} per year", money(amount)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_grouping() {
        assert_eq!(money(dec!(0)), "0.00");
        assert_eq!(money(dec!(999.999)), "1,000.00");
        assert_eq!(money(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(money(dec!(-45210.5)), "-45,210.50");
        assert_eq!(money(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_rates() {
        assert_eq!(pct(dec!(0.035)), "3.50%");
        assert_eq!(pct_points(dec!(-12.345)), "-12.35%");
        assert_eq!(factor(dec!(0.9090909090909)), "0.909091");
        assert_eq!(multiple(dec!(8)), "8.00x");
    }

    #[test]
    fn test_driver() {
        assert_eq!(driver(&Driver::PctOfRevenue(dec!(0.04))), "4.00% of revenue");
        assert_eq!(driver(&Driver::Fixed(dec!(2500000))), "2,500,000.00 per year");
    }
}
