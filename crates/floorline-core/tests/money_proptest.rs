//! Properties of the monetary rounding rules.

use proptest::prelude::*;
use rust_decimal::Decimal;

use floorline_core::money;

fn dollars() -> impl Strategy<Value = Decimal> {
    // cents-scale values up to $1M with extra fractional noise digits
    (0i64..100_000_000, 0u32..4).prop_map(|(cents, extra)| {
        Decimal::new(cents, 2) + Decimal::new(cents % 7, 2 + extra)
    })
}

proptest! {
    #[test]
    fn floor_never_exceeds_input(amount in dollars()) {
        let floored = money::floor_to_cents(amount);
        prop_assert!(floored <= amount);
        prop_assert!(amount - floored < Decimal::new(1, 2));
    }

    #[test]
    fn floor_is_idempotent(amount in dollars()) {
        let once = money::floor_to_cents(amount);
        prop_assert_eq!(once, money::floor_to_cents(once));
    }

    #[test]
    fn half_even_is_within_half_cent(amount in dollars()) {
        let rounded = money::round_half_even(amount);
        let delta = (rounded - amount).abs();
        prop_assert!(delta <= Decimal::new(5, 3));
        prop_assert!(rounded.scale() <= 2);
    }

    #[test]
    fn cents_round_trip_on_two_decimal_values(cents in 0i64..10_000_000) {
        let amount = money::from_cents(cents);
        prop_assert_eq!(money::to_cents(amount), cents);
    }

    #[test]
    fn percent_discount_never_exceeds_subtotal(
        subtotal_cents in 0i64..10_000_000,
        percent in 0i64..10_000,
    ) {
        let subtotal = Decimal::new(subtotal_cents, 2);
        let percent = Decimal::new(percent, 2); // 0.00%..100.00%
        let discount = money::floor_to_cents(subtotal * percent / Decimal::ONE_HUNDRED);
        prop_assert!(discount <= subtotal);
        prop_assert!(discount >= Decimal::ZERO);
    }
}
