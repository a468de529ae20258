use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A line on an order. `product_id`/`sku_id` are null for rep-authored
/// custom items, which instead carry their vendor directly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub collection: Option<String>,
    pub description: Option<String>,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    /// "sqft" | "unit"
    pub sell_by: String,
    /// "cut" | "roll" for carpet lines
    pub price_tier: Option<String>,
    pub is_sample: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
