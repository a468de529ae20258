use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart lines keyed by the anonymous storefront session. Transient: checkout
/// drains them in the order-placing transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: String,
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub name: String,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
    pub unit_price: Decimal,
    pub sell_by: String,
    pub price_tier: Option<String>,
    pub is_sample: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
