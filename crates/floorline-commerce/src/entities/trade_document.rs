use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata for a document stored in the trade-documents bucket; content is
/// served through presigned GET URLs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trade_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trade_customer_id: Uuid,
    pub file_name: String,
    pub object_key: String,
    pub content_type: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
