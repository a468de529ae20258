use sea_orm_migration::prelude::*;

use super::{bool_col, int_col, money, money_null, status_col, string_col, string_null, ts, ts_null, uuid_col, uuid_null, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct PromosMigration;

#[async_trait::async_trait]
impl MigrationTrait for PromosMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PromoCodes::Table)
                    .if_not_exists()
                    .col(uuid_pk(PromoCodes::Id))
                    .col(string_col(PromoCodes::Code).unique_key().to_owned())
                    .col(status_col(PromoCodes::PromoType))
                    .col(
                        ColumnDef::new(PromoCodes::Value)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(money_null(PromoCodes::MinOrderAmount))
                    .col(ColumnDef::new(PromoCodes::MaxUses).integer())
                    .col(ColumnDef::new(PromoCodes::MaxUsesPerCustomer).integer())
                    .col(ColumnDef::new(PromoCodes::RestrictedCategoryIds).json_binary())
                    .col(ColumnDef::new(PromoCodes::RestrictedProductIds).json_binary())
                    .col(bool_col(PromoCodes::IsActive, true))
                    .col(ts_null(PromoCodes::ExpiresAt))
                    .col(ts(PromoCodes::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromoCodeUsages::Table)
                    .if_not_exists()
                    .col(uuid_pk(PromoCodeUsages::Id))
                    .col(uuid_col(PromoCodeUsages::PromoCodeId))
                    .col(uuid_null(PromoCodeUsages::OrderId))
                    .col(uuid_null(PromoCodeUsages::QuoteId))
                    .col(string_col(PromoCodeUsages::CustomerEmail))
                    .col(money(PromoCodeUsages::DiscountAmount))
                    .col(ts(PromoCodeUsages::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_usages_code_order")
                    .table(PromoCodeUsages::Table)
                    .col(PromoCodeUsages::PromoCodeId)
                    .col(PromoCodeUsages::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Quotes::Table)
                    .if_not_exists()
                    .col(uuid_pk(Quotes::Id))
                    .col(string_col(Quotes::QuoteNumber).unique_key().to_owned())
                    .col(string_col(Quotes::Email))
                    .col(uuid_null(Quotes::CustomerId))
                    .col(uuid_null(Quotes::TradeCustomerId))
                    .col(uuid_null(Quotes::SalesRepId))
                    .col(status_col(Quotes::DeliveryMethod))
                    .col(ColumnDef::new(Quotes::ShippingAddress).json_binary())
                    .col(money(Quotes::Subtotal))
                    .col(money(Quotes::ShippingCost))
                    .col(money(Quotes::SampleShipping))
                    .col(money(Quotes::DiscountAmount))
                    .col(money(Quotes::Total))
                    .col(uuid_null(Quotes::PromoCodeId))
                    .col(status_col(Quotes::Status))
                    .col(ts_null(Quotes::ExpiresAt))
                    .col(uuid_null(Quotes::ConvertedOrderId))
                    .col(ColumnDef::new(Quotes::Notes).text())
                    .col(ts(Quotes::CreatedAt))
                    .col(ts(Quotes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuoteItems::Table)
                    .if_not_exists()
                    .col(uuid_pk(QuoteItems::Id))
                    .col(uuid_col(QuoteItems::QuoteId))
                    .col(uuid_null(QuoteItems::ProductId))
                    .col(uuid_null(QuoteItems::SkuId))
                    .col(uuid_null(QuoteItems::VendorId))
                    .col(string_col(QuoteItems::Name))
                    .col(string_null(QuoteItems::Collection))
                    .col(int_col(QuoteItems::NumBoxes))
                    .col(money_null(QuoteItems::SqftNeeded))
                    .col(money(QuoteItems::UnitPrice))
                    .col(money(QuoteItems::Subtotal))
                    .col(status_col(QuoteItems::SellBy))
                    .col(ColumnDef::new(QuoteItems::PriceTier).string_len(32))
                    .col(bool_col(QuoteItems::IsSample, false))
                    .col(ts(QuoteItems::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CartItems::Table)
                    .if_not_exists()
                    .col(uuid_pk(CartItems::Id))
                    .col(string_col(CartItems::SessionId))
                    .col(uuid_null(CartItems::ProductId))
                    .col(uuid_null(CartItems::SkuId))
                    .col(string_col(CartItems::Name))
                    .col(int_col(CartItems::NumBoxes))
                    .col(money_null(CartItems::SqftNeeded))
                    .col(money(CartItems::UnitPrice))
                    .col(status_col(CartItems::SellBy))
                    .col(ColumnDef::new(CartItems::PriceTier).string_len(32))
                    .col(bool_col(CartItems::IsSample, false))
                    .col(ts(CartItems::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cart_items_session")
                    .table(CartItems::Table)
                    .col(CartItems::SessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CartItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuoteItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quotes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromoCodeUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromoCodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PromoCodes {
    Table,
    Id,
    Code,
    PromoType,
    Value,
    MinOrderAmount,
    MaxUses,
    MaxUsesPerCustomer,
    RestrictedCategoryIds,
    RestrictedProductIds,
    IsActive,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PromoCodeUsages {
    Table,
    Id,
    PromoCodeId,
    OrderId,
    QuoteId,
    CustomerEmail,
    DiscountAmount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Quotes {
    Table,
    Id,
    QuoteNumber,
    Email,
    CustomerId,
    TradeCustomerId,
    SalesRepId,
    DeliveryMethod,
    ShippingAddress,
    Subtotal,
    ShippingCost,
    SampleShipping,
    DiscountAmount,
    Total,
    PromoCodeId,
    Status,
    ExpiresAt,
    ConvertedOrderId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QuoteItems {
    Table,
    Id,
    QuoteId,
    ProductId,
    SkuId,
    VendorId,
    Name,
    Collection,
    NumBoxes,
    SqftNeeded,
    UnitPrice,
    Subtotal,
    SellBy,
    PriceTier,
    IsSample,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CartItems {
    Table,
    Id,
    SessionId,
    ProductId,
    SkuId,
    Name,
    NumBoxes,
    SqftNeeded,
    UnitPrice,
    SellBy,
    PriceTier,
    IsSample,
    CreatedAt,
}
