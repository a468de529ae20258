//! The aggregation core shared by the cart- and order-keyed entry points.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::ShipmentLine;

/// Parcel/LTL cutoff: at exactly 150 lbs an order still goes parcel.
pub const PARCEL_MAX_LBS: i64 = 150;

#[derive(Clone, Debug)]
pub struct ShipmentPlan {
    /// total weight of non-sample lines
    pub total_weight: Decimal,
    /// per-freight-class weight, unclassified lines under "none"
    pub class_weights: BTreeMap<String, Decimal>,
    pub sample_only: bool,
}

impl ShipmentPlan {
    pub fn is_parcel(&self) -> bool {
        self.total_weight <= Decimal::from(PARCEL_MAX_LBS)
    }
}

pub fn plan(lines: &[ShipmentLine]) -> ShipmentPlan {
    let mut total_weight = Decimal::ZERO;
    let mut class_weights: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut any_product = false;

    for line in lines {
        if line.is_sample {
            continue;
        }
        any_product = true;
        let weight = line.weight();
        total_weight += weight;
        let class = line
            .freight_class
            .clone()
            .unwrap_or_else(|| "none".to_string());
        *class_weights.entry(class).or_insert(Decimal::ZERO) += weight;
    }

    ShipmentPlan {
        total_weight,
        class_weights,
        sample_only: !any_product && !lines.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(boxes: i32, weight: Decimal, class: Option<&str>) -> ShipmentLine {
        ShipmentLine {
            num_boxes: boxes,
            weight_per_box: weight,
            freight_class: class.map(str::to_string),
            is_sample: false,
        }
    }

    #[test]
    fn exactly_150_lbs_is_parcel() {
        let plan = plan(&[line(3, dec!(50), None)]);
        assert_eq!(plan.total_weight, dec!(150));
        assert!(plan.is_parcel());
    }

    #[test]
    fn over_150_lbs_is_ltl() {
        let plan = plan(&[line(3, dec!(50.0034), None)]);
        assert!(!plan.is_parcel());
    }

    #[test]
    fn weight_partitions_by_freight_class() {
        let plan = plan(&[
            line(10, dec!(50), Some("70")),
            line(5, dec!(80), Some("125")),
        ]);
        assert_eq!(plan.class_weights["70"], dec!(500));
        assert_eq!(plan.class_weights["125"], dec!(400));
        assert_eq!(plan.total_weight, dec!(900));
    }

    #[test]
    fn samples_do_not_weigh() {
        let mut sample = line(4, dec!(1), None);
        sample.is_sample = true;
        let plan = plan(&[sample]);
        assert!(plan.sample_only);
        assert_eq!(plan.total_weight, Decimal::ZERO);
    }
}
