use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A shippable line, already joined with its catalog weight data.
#[derive(Clone, Debug)]
pub struct ShipmentLine {
    pub num_boxes: i32,
    pub weight_per_box: Decimal,
    pub freight_class: Option<String>,
    pub is_sample: bool,
}

impl ShipmentLine {
    pub fn weight(&self) -> Decimal {
        self.weight_per_box * Decimal::from(self.num_boxes)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentMethod {
    Parcel,
    Ltl,
    /// sample-only orders ship free in an envelope
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateOption {
    pub carrier: String,
    pub service: String,
    pub cost: Decimal,
    pub transit_days: Option<i32>,
    pub is_cheapest: bool,
    pub is_fallback: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateQuote {
    pub method: ShipmentMethod,
    pub total_weight_lbs: Decimal,
    pub options: Vec<RateOption>,
    /// true when the LTL rater failed and the zone table answered instead
    pub is_fallback: bool,
}
