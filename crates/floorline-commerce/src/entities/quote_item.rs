use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quote_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub quote_id: Uuid,
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub collection: Option<String>,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub sell_by: String,
    pub price_tier: Option<String>,
    pub is_sample: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote::Entity",
        from = "Column::QuoteId",
        to = "super::quote::Column::Id"
    )]
    Quote,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
