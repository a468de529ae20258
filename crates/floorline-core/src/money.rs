//! Monetary arithmetic rules.
//!
//! Every monetary column is `DECIMAL(12,2)`. The rules here are load-bearing:
//!
//! - discounts round **down** so a discount never exceeds the eligible
//!   subtotal by fractional cents;
//! - pro-rata division rounds **half to even**;
//! - storage truncates to two decimals (toward zero, so refund magnitudes
//!   are never inflated).

use rust_decimal::{Decimal, RoundingStrategy};

pub const TWO_DP: u32 = 2;

/// Half-to-even to two decimals. Use for division results and pro-rata splits.
pub fn round_half_even(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(TWO_DP, RoundingStrategy::MidpointNearestEven)
}

/// Truncate toward zero to two decimals. Use for discounts and at storage.
pub fn floor_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(TWO_DP, RoundingStrategy::ToZero)
}

/// Divide with half-to-even rounding.
pub fn divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    round_half_even(numerator / denominator)
}

pub fn to_cents(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn discount_floor_never_exceeds_subtotal() {
        // 33.333…% of $10.00 is $3.33, not $3.34
        let discount = dec!(10.00) * dec!(33.3333) / dec!(100);
        assert_eq!(floor_to_cents(discount), dec!(3.33));
    }

    #[test]
    fn division_rounds_half_to_even() {
        assert_eq!(divide(dec!(0.125), dec!(1)), dec!(0.12));
        assert_eq!(divide(dec!(0.135), dec!(1)), dec!(0.14));
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(floor_to_cents(dec!(-3.339)), dec!(-3.33));
        assert_eq!(floor_to_cents(dec!(3.339)), dec!(3.33));
    }

    #[test]
    fn cents_round_trip() {
        assert_eq!(to_cents(dec!(120.00)), 12000);
        assert_eq!(from_cents(12000), dec!(120.00));
    }
}
