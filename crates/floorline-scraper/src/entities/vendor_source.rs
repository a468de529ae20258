use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One scrapeable vendor feed. `scraper_key` selects the module from the
/// registry; `config` is that module's opaque settings blob.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_sources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub scraper_key: String,
    /// standard 5-field cron; None means manual-only
    pub cron_schedule: Option<String>,
    pub is_active: bool,
    pub config: Json,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scrape_job::Entity")]
    Jobs,
}

impl Related<super::scrape_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
