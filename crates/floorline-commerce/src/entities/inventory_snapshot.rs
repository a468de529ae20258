use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Written by inventory scrapers; the stock-alert notifier reads the most
/// recent fresh snapshot per SKU.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku_id: Uuid,
    pub qty_on_hand: i32,
    pub captured_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
