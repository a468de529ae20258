//! Commerce schema, split along service seams. The server's migration crate
//! aggregates these in dependency order.

mod catalog;
mod orders;
mod partners;
mod payments;
mod promos;
mod purchasing;

pub use catalog::CatalogMigration;
pub use orders::OrdersMigration;
pub use partners::PartnersMigration;
pub use payments::PaymentsMigration;
pub use promos::PromosMigration;
pub use purchasing::PurchasingMigration;

use sea_orm_migration::prelude::*;

pub(crate) fn uuid_pk<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).uuid().not_null().primary_key().to_owned()
}

pub(crate) fn uuid_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).uuid().not_null().to_owned()
}

pub(crate) fn uuid_null<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).uuid().to_owned()
}

pub(crate) fn money<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .decimal_len(12, 2)
        .not_null()
        .default(0)
        .to_owned()
}

pub(crate) fn money_null<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).decimal_len(12, 2).to_owned()
}

pub(crate) fn string_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).string_len(255).not_null().to_owned()
}

pub(crate) fn string_null<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).string_len(255).to_owned()
}

pub(crate) fn status_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).string_len(32).not_null().to_owned()
}

pub(crate) fn ts<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

pub(crate) fn ts_null<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).timestamp_with_time_zone().to_owned()
}

pub(crate) fn bool_col<T: IntoIden>(name: T, default: bool) -> ColumnDef {
    ColumnDef::new(name)
        .boolean()
        .not_null()
        .default(default)
        .to_owned()
}

pub(crate) fn int_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).integer().not_null().to_owned()
}
