use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// EDI settings live in `edi_config` (`{"enabled": bool, "sftp_host": …,
/// "sftp_user": …, "inbox_dir": …}`). When absent or disabled, PO dispatch
/// falls back to email.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// short code used in PO numbers
    #[sea_orm(unique)]
    pub code: String,
    pub email: Option<String>,
    pub edi_config: Option<Json>,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Model {
    pub fn edi_enabled(&self) -> bool {
        self.edi_config
            .as_ref()
            .and_then(|c| c.get("enabled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

impl ActiveModelBehavior for ActiveModel {}
