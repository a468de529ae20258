use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// At most one `running` row per source, enforced by a partial unique
/// index — the job lock is this insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scrape_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_source_id: Uuid,
    /// "running" | "completed" | "failed" | "cancelled"
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub products_found: i32,
    pub products_updated: i32,
    /// append-only array of error strings
    pub errors: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor_source::Entity",
        from = "Column::VendorSourceId",
        to = "super::vendor_source::Column::Id"
    )]
    Source,
}

impl Related<super::vendor_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
