use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money};

use crate::entities::{order, purchase_order, purchase_order_item, rep_commission, sales_rep};
use crate::error::{CommerceError, CommerceResult};
use crate::types::{CommissionStatus, OrderStatus, PoItemStatus, PoStatus};

/// Recomputed after every order mutation (via the outbox handler), so brief
/// windows where the commission trails the order are expected.
#[derive(Clone)]
pub struct CommissionService {
    db: DatabaseConnection,
    /// vendor-cost estimate for orders that have no POs yet
    default_cost_ratio: Decimal,
}

impl CommissionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            default_cost_ratio: Decimal::new(60, 2),
        }
    }

    pub fn with_cost_ratio(mut self, ratio: Decimal) -> Self {
        self.default_cost_ratio = ratio;
        self
    }

    #[instrument(skip(self))]
    pub async fn recompute(&self, order_id: Uuid) -> CommerceResult<Option<rep_commission::Model>> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let Some(rep_id) = order.sales_rep_id else {
            return Ok(None);
        };
        let rep = sales_rep::Entity::find_by_id(rep_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CommerceError::Validation(format!("sales rep {rep_id} not found")))?;

        let pos = purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let vendor_cost = if pos.is_empty() {
            money::floor_to_cents(order.total * self.default_cost_ratio)
        } else {
            let mut cost = Decimal::ZERO;
            for po in &pos {
                if po.status == PoStatus::Cancelled.as_str() {
                    continue;
                }
                let items = purchase_order_item::Entity::find()
                    .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
                    .all(&txn)
                    .await?;
                cost += items
                    .iter()
                    .filter(|i| i.status != PoItemStatus::Cancelled.as_str())
                    .map(|i| i.subtotal)
                    .sum::<Decimal>();
            }
            cost
        };

        let margin = (order.total - vendor_cost).max(Decimal::ZERO);
        let amount = money::round_half_even(margin * rep.commission_rate);

        let order_status = OrderStatus::parse(&order.status)?;
        let status = match order_status {
            OrderStatus::Cancelled | OrderStatus::Refunded => CommissionStatus::Forfeited,
            OrderStatus::Delivered if order.amount_paid >= order.total => CommissionStatus::Earned,
            _ => CommissionStatus::Pending,
        };

        let existing = rep_commission::Entity::find()
            .filter(rep_commission::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?;
        let model = match existing {
            Some(row) => {
                // "paid" is terminal: recomputation updates the numbers but
                // never claws the status back
                let keep_paid = row.status == CommissionStatus::Paid.as_str();
                let mut active: rep_commission::ActiveModel = row.into();
                active.sales_rep_id = Set(rep_id);
                active.rate = Set(rep.commission_rate);
                active.order_total = Set(order.total);
                active.vendor_cost = Set(vendor_cost);
                active.margin = Set(margin);
                active.amount = Set(amount);
                if !keep_paid {
                    active.status = Set(status.as_str().to_string());
                }
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?
            }
            None => rep_commission::ActiveModel {
                id: Set(generate_id()),
                order_id: Set(order_id),
                sales_rep_id: Set(rep_id),
                rate: Set(rep.commission_rate),
                order_total: Set(order.total),
                vendor_cost: Set(vendor_cost),
                margin: Set(margin),
                amount: Set(amount),
                status: Set(status.as_str().to_string()),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?,
        };

        txn.commit().await?;
        Ok(Some(model))
    }

    pub async fn mark_paid(&self, order_id: Uuid) -> CommerceResult<rep_commission::Model> {
        let row = rep_commission::Entity::find()
            .filter(rep_commission::Column::OrderId.eq(order_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                CommerceError::Validation(format!("no commission recorded for order {order_id}"))
            })?;
        if row.status == CommissionStatus::Forfeited.as_str() {
            return Err(CommerceError::Conflict("commission was forfeited".into()));
        }
        let mut active: rep_commission::ActiveModel = row.into();
        active.status = Set(CommissionStatus::Paid.as_str().to_string());
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn for_rep(&self, rep_id: Uuid) -> CommerceResult<Vec<rep_commission::Model>> {
        Ok(rep_commission::Entity::find()
            .filter(rep_commission::Column::SalesRepId.eq(rep_id))
            .all(&self.db)
            .await?)
    }
}
