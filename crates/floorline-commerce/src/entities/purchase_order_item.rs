use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cost is always normalized to per-box at insert time, whatever the
/// pricing row's basis was.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub product_name: String,
    pub vendor_sku: Option<String>,
    pub qty: i32,
    pub cost_per_box: Decimal,
    pub original_cost: Option<Decimal>,
    pub retail_price: Option<Decimal>,
    pub subtotal: Decimal,
    pub sell_by: String,
    /// "pending" | "ordered" | "shipped" | "received" | "cancelled"
    pub status: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
