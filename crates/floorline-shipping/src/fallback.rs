//! Deterministic zone table used when the LTL rater is unreachable. The
//! failure is explicit: every option carries `is_fallback = true` and the
//! flag propagates into the order record.

use rust_decimal::Decimal;

use floorline_core::money;

use crate::types::RateOption;

const BASE_RATE_PER_LB_CENTS: i64 = 50;
const MINIMUM_CENTS: i64 = 150_00;

/// (zone multiplier ×100, transit days) per first ZIP digit, anchored to the
/// Anaheim origin: West Coast cheap and fast, East Coast dear and slow.
const ZONES: [(i64, i32); 10] = [
    (180, 6), // 0xxxx New England
    (175, 6), // 1xxxx NY/PA
    (170, 5), // 2xxxx DC/VA
    (165, 5), // 3xxxx Southeast
    (155, 4), // 4xxxx Midwest
    (150, 4), // 5xxxx Upper Midwest
    (140, 3), // 6xxxx Plains
    (130, 3), // 7xxxx Texas
    (115, 2), // 8xxxx Mountain
    (100, 2), // 9xxxx West Coast
];

fn zone_for(dest_zip: &str) -> (Decimal, i32) {
    let digit = dest_zip
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .unwrap_or(9) as usize;
    let (multiplier, days) = ZONES[digit];
    (Decimal::new(multiplier, 2), days)
}

pub fn fallback_options(dest_zip: &str, total_weight_lbs: Decimal) -> Vec<RateOption> {
    let (zone_multiplier, transit_days) = zone_for(dest_zip);
    let base = Decimal::new(BASE_RATE_PER_LB_CENTS, 2) * zone_multiplier * total_weight_lbs;
    let economy = money::round_half_even(base.max(Decimal::new(MINIMUM_CENTS, 2)));

    let tier = |service: &str, multiplier: Decimal, days_delta: i32, cheapest: bool| RateOption {
        carrier: "Estimated Freight".to_string(),
        service: service.to_string(),
        cost: money::round_half_even(economy * multiplier),
        transit_days: Some((transit_days + days_delta).max(1)),
        is_cheapest: cheapest,
        is_fallback: true,
    };

    vec![
        tier("Economy", Decimal::ONE, 0, true),
        tier("Standard", Decimal::new(130, 2), -1, false),
        tier("Expedited", Decimal::new(175, 2), -2, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minimum_applies_to_light_shipments() {
        let options = fallback_options("77002", dec!(10));
        assert_eq!(options[0].cost, dec!(150.00));
        assert!(options[0].is_fallback);
        assert!(options[0].is_cheapest);
    }

    #[test]
    fn tiers_scale_from_economy() {
        let options = fallback_options("10001", dec!(900));
        // 900 lb × $0.50 × 1.75 zone = $787.50
        assert_eq!(options[0].cost, dec!(787.50));
        assert_eq!(options[1].cost, dec!(1023.75));
        // 787.50 × 1.75 = 1378.125, half-to-even lands on the even cent
        assert_eq!(options[2].cost, dec!(1378.12));
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn west_coast_zone_is_cheapest_and_fastest() {
        let west = fallback_options("92101", dec!(400));
        let east = fallback_options("02101", dec!(400));
        assert!(west[0].cost < east[0].cost);
        assert!(west[0].transit_days < east[0].transit_days);
    }
}
