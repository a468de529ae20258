#![allow(elided_lifetimes_in_paths)]

pub use sea_orm_migration::prelude::*;

use floorline_auth::AuthMigration;
use floorline_commerce::migration::{
    CatalogMigration, OrdersMigration, PartnersMigration, PaymentsMigration, PromosMigration,
    PurchasingMigration,
};
use floorline_outbox::SysEventsMigration;
use floorline_scraper::ScraperMigration;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(AuthMigration),
            Box::new(CatalogMigration),
            Box::new(PartnersMigration),
            Box::new(OrdersMigration),
            Box::new(PurchasingMigration),
            Box::new(PaymentsMigration),
            Box::new(PromosMigration),
            Box::new(ScraperMigration),
            Box::new(SysEventsMigration),
        ]
    }
}
