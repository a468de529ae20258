use sea_orm_migration::prelude::*;

use super::{bool_col, int_col, money, money_null, status_col, string_col, string_null, ts, ts_null, uuid_col, uuid_null, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct OrdersMigration;

#[async_trait::async_trait]
impl MigrationTrait for OrdersMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(uuid_pk(Orders::Id))
                    .col(string_col(Orders::OrderNumber).unique_key().to_owned())
                    .col(string_col(Orders::Email))
                    .col(uuid_null(Orders::CustomerId))
                    .col(uuid_null(Orders::TradeCustomerId))
                    .col(uuid_null(Orders::SalesRepId))
                    .col(uuid_null(Orders::ProjectId))
                    .col(status_col(Orders::Source))
                    .col(status_col(Orders::DeliveryMethod))
                    .col(ColumnDef::new(Orders::ShippingAddress).json_binary())
                    .col(string_null(Orders::ShippingCarrier))
                    .col(string_null(Orders::ShippingService))
                    .col(ColumnDef::new(Orders::TransitDays).integer())
                    .col(bool_col(Orders::Residential, true))
                    .col(bool_col(Orders::Liftgate, true))
                    .col(bool_col(Orders::IsFallbackRate, false))
                    .col(money(Orders::Subtotal))
                    .col(money(Orders::ShippingCost))
                    .col(money(Orders::SampleShipping))
                    .col(money(Orders::DiscountAmount))
                    .col(money(Orders::Total))
                    .col(money(Orders::AmountPaid))
                    .col(money(Orders::RefundAmount))
                    .col(uuid_null(Orders::PromoCodeId))
                    .col(status_col(Orders::Status))
                    .col(string_null(Orders::TrackingNumber))
                    .col(string_null(Orders::TrackingCarrier))
                    .col(string_null(Orders::CancelReason))
                    .col(ts_null(Orders::ConfirmedAt))
                    .col(ts_null(Orders::ShippedAt))
                    .col(ts_null(Orders::DeliveredAt))
                    .col(ts_null(Orders::CancelledAt))
                    .col(ts_null(Orders::RefundedAt))
                    .col(ts(Orders::CreatedAt))
                    .col(ts(Orders::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_email")
                    .table(Orders::Table)
                    .col(Orders::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(uuid_pk(OrderItems::Id))
                    .col(uuid_col(OrderItems::OrderId))
                    .col(uuid_null(OrderItems::ProductId))
                    .col(uuid_null(OrderItems::SkuId))
                    .col(uuid_null(OrderItems::VendorId))
                    .col(string_col(OrderItems::Name))
                    .col(string_null(OrderItems::Collection))
                    .col(ColumnDef::new(OrderItems::Description).text())
                    .col(int_col(OrderItems::NumBoxes))
                    .col(money_null(OrderItems::SqftNeeded))
                    .col(money(OrderItems::UnitPrice))
                    .col(money(OrderItems::Subtotal))
                    .col(status_col(OrderItems::SellBy))
                    .col(ColumnDef::new(OrderItems::PriceTier).string_len(32))
                    .col(bool_col(OrderItems::IsSample, false))
                    .col(ts(OrderItems::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderActivityLogs::Table)
                    .if_not_exists()
                    .col(uuid_pk(OrderActivityLogs::Id))
                    .col(uuid_col(OrderActivityLogs::OrderId))
                    .col(string_null(OrderActivityLogs::Actor))
                    .col(string_col(OrderActivityLogs::Action))
                    .col(
                        ColumnDef::new(OrderActivityLogs::Detail)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ts(OrderActivityLogs::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderPriceAdjustments::Table)
                    .if_not_exists()
                    .col(uuid_pk(OrderPriceAdjustments::Id))
                    .col(uuid_col(OrderPriceAdjustments::OrderId))
                    .col(uuid_col(OrderPriceAdjustments::OrderItemId))
                    .col(money(OrderPriceAdjustments::OldUnitPrice))
                    .col(money(OrderPriceAdjustments::NewUnitPrice))
                    .col(string_null(OrderPriceAdjustments::Reason))
                    .col(uuid_col(OrderPriceAdjustments::AdjustedBy))
                    .col(ts(OrderPriceAdjustments::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderPriceAdjustments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderActivityLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    Email,
    CustomerId,
    TradeCustomerId,
    SalesRepId,
    ProjectId,
    Source,
    DeliveryMethod,
    ShippingAddress,
    ShippingCarrier,
    ShippingService,
    TransitDays,
    Residential,
    Liftgate,
    IsFallbackRate,
    Subtotal,
    ShippingCost,
    SampleShipping,
    DiscountAmount,
    Total,
    AmountPaid,
    RefundAmount,
    PromoCodeId,
    Status,
    TrackingNumber,
    TrackingCarrier,
    CancelReason,
    ConfirmedAt,
    ShippedAt,
    DeliveredAt,
    CancelledAt,
    RefundedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    SkuId,
    VendorId,
    Name,
    Collection,
    Description,
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
enum OrderActivityLogs {
    Table,
    Id,
    OrderId,
    Actor,
    Action,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrderPriceAdjustments {
    Table,
    Id,
    OrderId,
    OrderItemId,
    OldUnitPrice,
    NewUnitPrice,
    Reason,
    AdjustedBy,
    CreatedAt,
}
