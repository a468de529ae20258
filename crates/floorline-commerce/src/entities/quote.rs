use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Same buyer/shipping/totals shape as an order. A converted quote is
/// immutable and keeps a pointer to the order it became.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub quote_number: String,
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub sales_rep_id: Option<Uuid>,
    pub delivery_method: String,
    pub shipping_address: Option<Json>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub sample_shipping: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub promo_code_id: Option<Uuid>,
    /// "draft" | "sent" | "converted" | "expired"
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub converted_order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quote_item::Entity")]
    Items,
}

impl Related<super::quote_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
