use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trade_customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub company_name: String,
    pub password_hash: String,
    pub tier_id: Option<Uuid>,
    /// denormalized from the tier at promotion time
    pub discount_percent: Decimal,
    /// cumulative order totals; drives tier promotion, never demotion
    pub lifetime_spend: Decimal,
    pub assigned_rep_id: Option<Uuid>,
    pub is_approved: bool,
    pub is_active: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// "active" | "past_due" | "cancelled"
    pub subscription_status: Option<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trade_tier::Entity",
        from = "Column::TierId",
        to = "super::trade_tier::Column::Id"
    )]
    Tier,
}

impl Related<super::trade_tier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
