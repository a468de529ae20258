use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An order is never deleted, only transitioned. The monetary identity
/// `total = subtotal + shipping_cost + sample_shipping - discount_amount`
/// holds at every commit; `amount_paid` is the cached ledger aggregate.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub sales_rep_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    /// "retail" | "trade" | "rep" | "quote"
    pub source: String,

    /// "pickup" | "shipping"
    pub delivery_method: String,
    pub shipping_address: Option<Json>,
    pub shipping_carrier: Option<String>,
    pub shipping_service: Option<String>,
    pub transit_days: Option<i32>,
    pub residential: bool,
    pub liftgate: bool,
    pub is_fallback_rate: bool,

    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub sample_shipping: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub refund_amount: Decimal,
    pub promo_code_id: Option<Uuid>,

    pub status: String,
    pub tracking_number: Option<String>,
    pub tracking_carrier: Option<String>,
    pub cancel_reason: Option<String>,

    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
    #[sea_orm(has_many = "super::order_payment::Entity")]
    Payments,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl Related<super::order_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
