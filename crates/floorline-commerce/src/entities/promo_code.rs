use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    /// "percent" | "fixed"
    pub promo_type: String,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    /// counts only order-backed usages; quote usages are free
    pub max_uses: Option<i32>,
    pub max_uses_per_customer: Option<i32>,
    /// uuid arrays; empty/null means unrestricted
    pub restricted_category_ids: Option<Json>,
    pub restricted_product_ids: Option<Json>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promo_code_usage::Entity")]
    Usages,
}

impl Related<super::promo_code_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
