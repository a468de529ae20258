use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::instrument;
use uuid::Uuid;

use floorline_commerce::entities::{cart_item, order_item, product};

use crate::aggregate::{self, ShipmentPlan};
use crate::error::{ShippingError, ShippingResult};
use crate::fallback;
use crate::ltl::{default_pickup_date, LtlLine, LtlRater, LtlRequest};
use crate::parcel::ParcelRater;
use crate::types::{RateOption, RateQuote, ShipmentLine, ShipmentMethod};

pub const DEFAULT_ORIGIN_ZIP: &str = "92806";
const LTL_TOP_N: usize = 3;

/// Two entry points (cart by session, order by id) over one aggregation
/// core; the raters behind traits so tests can stub them.
#[derive(Clone)]
pub struct ShippingService {
    db: DatabaseConnection,
    parcel: Arc<dyn ParcelRater>,
    ltl: Arc<dyn LtlRater>,
    origin_zip: String,
}

impl ShippingService {
    pub fn new(
        db: DatabaseConnection,
        parcel: Arc<dyn ParcelRater>,
        ltl: Arc<dyn LtlRater>,
    ) -> Self {
        Self {
            db,
            parcel,
            ltl,
            origin_zip: DEFAULT_ORIGIN_ZIP.to_string(),
        }
    }

    pub fn with_origin_zip(mut self, zip: impl Into<String>) -> Self {
        self.origin_zip = zip.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn estimate_for_cart(
        &self,
        session_id: &str,
        dest_zip: &str,
        residential: bool,
        liftgate: bool,
    ) -> ShippingResult<RateQuote> {
        let rows = cart_item::Entity::find()
            .filter(cart_item::Column::SessionId.eq(session_id))
            .all(&self.db)
            .await?;
        let lines = self
            .resolve_lines(rows.iter().map(|r| (r.product_id, r.num_boxes, r.is_sample)))
            .await?;
        self.rate(&lines, dest_zip, residential, liftgate).await
    }

    #[instrument(skip(self))]
    pub async fn estimate_for_order(
        &self,
        order_id: Uuid,
        dest_zip: &str,
        residential: bool,
        liftgate: bool,
    ) -> ShippingResult<RateQuote> {
        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&self.db)
            .await?;
        let lines = self
            .resolve_lines(rows.iter().map(|r| (r.product_id, r.num_boxes, r.is_sample)))
            .await?;
        self.rate(&lines, dest_zip, residential, liftgate).await
    }

    async fn resolve_lines(
        &self,
        rows: impl Iterator<Item = (Option<Uuid>, i32, bool)>,
    ) -> ShippingResult<Vec<ShipmentLine>> {
        let mut lines = Vec::new();
        for (product_id, num_boxes, is_sample) in rows {
            let (weight_per_box, freight_class) = match product_id {
                Some(id) => {
                    let product = product::Entity::find_by_id(id).one(&self.db).await?;
                    (
                        product
                            .as_ref()
                            .and_then(|p| p.weight_per_box)
                            .unwrap_or(Decimal::ZERO),
                        product.and_then(|p| p.freight_class),
                    )
                }
                None => (Decimal::ZERO, None),
            };
            lines.push(ShipmentLine {
                num_boxes,
                weight_per_box,
                freight_class,
                is_sample,
            });
        }
        Ok(lines)
    }

    /// The shared core: parcel at or under 150 lbs, LTL above, free envelope
    /// for sample-only, zone fallback when the LTL rater fails.
    pub async fn rate(
        &self,
        lines: &[ShipmentLine],
        dest_zip: &str,
        residential: bool,
        liftgate: bool,
    ) -> ShippingResult<RateQuote> {
        if lines.is_empty() {
            return Err(ShippingError::Validation("nothing to rate".into()));
        }
        if dest_zip.len() < 5 || !dest_zip.chars().take(5).all(|c| c.is_ascii_digit()) {
            return Err(ShippingError::Validation(format!(
                "invalid destination ZIP {dest_zip}"
            )));
        }

        let plan = aggregate::plan(lines);
        if plan.sample_only {
            return Ok(RateQuote {
                method: ShipmentMethod::None,
                total_weight_lbs: Decimal::ZERO,
                options: vec![RateOption {
                    carrier: "USPS".to_string(),
                    service: "Sample envelope".to_string(),
                    cost: Decimal::ZERO,
                    transit_days: Some(5),
                    is_cheapest: true,
                    is_fallback: false,
                }],
                is_fallback: false,
            });
        }

        if plan.is_parcel() {
            self.rate_parcel(&plan, dest_zip).await
        } else {
            Ok(self.rate_ltl(&plan, dest_zip, residential, liftgate).await)
        }
    }

    async fn rate_parcel(&self, plan: &ShipmentPlan, dest_zip: &str) -> ShippingResult<RateQuote> {
        let quotes = self
            .parcel
            .quote(&self.origin_zip, dest_zip, plan.total_weight)
            .await?;
        let mut cheapest = quotes
            .into_iter()
            .min_by_key(|q| floorline_core::money::to_cents(q.cost))
            .ok_or_else(|| ShippingError::ParcelRater("no parcel rates returned".into()))?;
        cheapest.is_cheapest = true;
        Ok(RateQuote {
            method: ShipmentMethod::Parcel,
            total_weight_lbs: plan.total_weight,
            options: vec![cheapest],
            is_fallback: false,
        })
    }

    /// LTL failure is not silent: the fallback result is flagged and the
    /// flag follows the selection onto the order.
    async fn rate_ltl(
        &self,
        plan: &ShipmentPlan,
        dest_zip: &str,
        residential: bool,
        liftgate: bool,
    ) -> RateQuote {
        let request = LtlRequest {
            origin_zip: self.origin_zip.clone(),
            dest_zip: dest_zip.to_string(),
            lines: plan
                .class_weights
                .iter()
                .map(|(class, weight)| LtlLine {
                    freight_class: class.clone(),
                    weight_lbs: weight.ceil().to_i64().unwrap_or(0),
                })
                .collect(),
            pickup_date: default_pickup_date(),
            residential,
            liftgate,
        };

        match self.ltl.quote(&request).await {
            Ok(mut quotes) if !quotes.is_empty() => {
                quotes.sort_by_key(|q| floorline_core::money::to_cents(q.cost));
                quotes.truncate(LTL_TOP_N);
                quotes[0].is_cheapest = true;
                RateQuote {
                    method: ShipmentMethod::Ltl,
                    total_weight_lbs: plan.total_weight,
                    options: quotes,
                    is_fallback: false,
                }
            }
            Ok(_) => {
                tracing::warn!(dest_zip, "LTL rater returned no quotes, using zone fallback");
                self.fallback_quote(plan, dest_zip)
            }
            Err(err) => {
                tracing::warn!(dest_zip, error = %err, "LTL rater failed, using zone fallback");
                self.fallback_quote(plan, dest_zip)
            }
        }
    }

    fn fallback_quote(&self, plan: &ShipmentPlan, dest_zip: &str) -> RateQuote {
        RateQuote {
            method: ShipmentMethod::Ltl,
            total_weight_lbs: plan.total_weight,
            options: fallback::fallback_options(dest_zip, plan.total_weight),
            is_fallback: true,
        }
    }
}
