use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "skus")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub vendor_sku: String,
    /// "per_sqft" | "per_box" — the basis vendor cost is quoted in
    pub price_basis: String,
    pub cost: Decimal,
    /// carpet tier costs; fall back to `cost` when absent
    pub cut_cost: Option<Decimal>,
    pub roll_cost: Option<Decimal>,
    pub retail_price: Decimal,
    /// "sqft" | "unit"
    pub sell_by: String,
    /// "slab" variants are pickup-only
    pub variant_type: Option<String>,
    pub is_sample: bool,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
