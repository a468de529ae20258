use sea_orm_migration::prelude::*;

use super::{bool_col, int_col, money_null, string_col, string_null, ts, ts_null, uuid_col, uuid_null, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct CatalogMigration;

#[async_trait::async_trait]
impl MigrationTrait for CatalogMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(uuid_pk(Vendors::Id))
                    .col(string_col(Vendors::Name))
                    .col(string_col(Vendors::Code).unique_key().to_owned())
                    .col(string_null(Vendors::Email))
                    .col(ColumnDef::new(Vendors::EdiConfig).json_binary())
                    .col(bool_col(Vendors::IsActive, true))
                    .col(ts(Vendors::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(uuid_pk(Products::Id))
                    .col(uuid_col(Products::VendorId))
                    .col(string_col(Products::Name))
                    .col(string_null(Products::Collection))
                    .col(uuid_null(Products::CategoryId))
                    .col(string_null(Products::CategorySlug))
                    .col(string_null(Products::FreightClass))
                    .col(money_null(Products::WeightPerBox))
                    .col(money_null(Products::SqftPerBox))
                    .col(bool_col(Products::IsActive, true))
                    .col(ts(Products::CreatedAt))
                    .col(ts(Products::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Skus::Table)
                    .if_not_exists()
                    .col(uuid_pk(Skus::Id))
                    .col(uuid_col(Skus::ProductId))
                    .col(string_col(Skus::VendorSku).unique_key().to_owned())
                    .col(ColumnDef::new(Skus::PriceBasis).string_len(32).not_null())
                    .col(super::money(Skus::Cost))
                    .col(money_null(Skus::CutCost))
                    .col(money_null(Skus::RollCost))
                    .col(super::money(Skus::RetailPrice))
                    .col(ColumnDef::new(Skus::SellBy).string_len(32).not_null())
                    .col(string_null(Skus::VariantType))
                    .col(bool_col(Skus::IsSample, false))
                    .col(bool_col(Skus::IsActive, true))
                    .col(ts(Skus::CreatedAt))
                    .col(ts(Skus::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventorySnapshots::Table)
                    .if_not_exists()
                    .col(uuid_pk(InventorySnapshots::Id))
                    .col(uuid_col(InventorySnapshots::SkuId))
                    .col(int_col(InventorySnapshots::QtyOnHand))
                    .col(ts(InventorySnapshots::CapturedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_snapshots_sku_captured")
                    .table(InventorySnapshots::Table)
                    .col(InventorySnapshots::SkuId)
                    .col(InventorySnapshots::CapturedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockAlerts::Table)
                    .if_not_exists()
                    .col(uuid_pk(StockAlerts::Id))
                    .col(uuid_col(StockAlerts::SkuId))
                    .col(string_col(StockAlerts::Email))
                    .col(super::status_col(StockAlerts::Status))
                    .col(ts(StockAlerts::CreatedAt))
                    .col(ts_null(StockAlerts::NotifiedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockAlerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventorySnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Skus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
    Name,
    Code,
    Email,
    EdiConfig,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    VendorId,
    Name,
    Collection,
    CategoryId,
    CategorySlug,
    FreightClass,
    WeightPerBox,
    SqftPerBox,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Skus {
    Table,
    Id,
    ProductId,
    VendorSku,
    PriceBasis,
    Cost,
    CutCost,
    RollCost,
    RetailPrice,
    SellBy,
    VariantType,
    IsSample,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventorySnapshots {
    Table,
    Id,
    SkuId,
    QtyOnHand,
    CapturedAt,
}

#[derive(DeriveIden)]
enum StockAlerts {
    Table,
    Id,
    SkuId,
    Email,
    Status,
    CreatedAt,
    NotifiedAt,
}
