use sea_orm_migration::prelude::*;

use super::{bool_col, int_col, money, string_col, string_null, status_col, ts, ts_null, uuid_col, uuid_null, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct PartnersMigration;

#[async_trait::async_trait]
impl MigrationTrait for PartnersMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(uuid_pk(Customers::Id))
                    .col(string_col(Customers::Email).unique_key().to_owned())
                    .col(string_null(Customers::Name))
                    .col(ColumnDef::new(Customers::PasswordHash).string_len(512))
                    .col(string_null(Customers::Phone))
                    .col(ts(Customers::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SalesReps::Table)
                    .if_not_exists()
                    .col(uuid_pk(SalesReps::Id))
                    .col(string_col(SalesReps::Email).unique_key().to_owned())
                    .col(string_col(SalesReps::Name))
                    .col(
                        ColumnDef::new(SalesReps::PasswordHash)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesReps::CommissionRate)
                            .decimal_len(6, 4)
                            .not_null(),
                    )
                    .col(bool_col(SalesReps::IsActive, true))
                    .col(ts(SalesReps::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TradeTiers::Table)
                    .if_not_exists()
                    .col(uuid_pk(TradeTiers::Id))
                    .col(string_col(TradeTiers::Name).unique_key().to_owned())
                    .col(
                        ColumnDef::new(TradeTiers::DiscountPercent)
                            .decimal_len(5, 2)
                            .not_null(),
                    )
                    .col(money(TradeTiers::SpendThreshold))
                    .col(int_col(TradeTiers::Rank))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TradeCustomers::Table)
                    .if_not_exists()
                    .col(uuid_pk(TradeCustomers::Id))
                    .col(string_col(TradeCustomers::Email).unique_key().to_owned())
                    .col(string_col(TradeCustomers::CompanyName))
                    .col(
                        ColumnDef::new(TradeCustomers::PasswordHash)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(uuid_null(TradeCustomers::TierId))
                    .col(
                        ColumnDef::new(TradeCustomers::DiscountPercent)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(money(TradeCustomers::LifetimeSpend))
                    .col(uuid_null(TradeCustomers::AssignedRepId))
                    .col(bool_col(TradeCustomers::IsApproved, false))
                    .col(bool_col(TradeCustomers::IsActive, true))
                    .col(string_null(TradeCustomers::StripeCustomerId))
                    .col(string_null(TradeCustomers::StripeSubscriptionId))
                    .col(
                        ColumnDef::new(TradeCustomers::SubscriptionStatus).string_len(32),
                    )
                    .col(ts_null(TradeCustomers::SubscriptionExpiresAt))
                    .col(ts(TradeCustomers::CreatedAt))
                    .col(ts(TradeCustomers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TradeDocuments::Table)
                    .if_not_exists()
                    .col(uuid_pk(TradeDocuments::Id))
                    .col(uuid_col(TradeDocuments::TradeCustomerId))
                    .col(string_col(TradeDocuments::FileName))
                    .col(ColumnDef::new(TradeDocuments::ObjectKey).string_len(512).not_null())
                    .col(string_col(TradeDocuments::ContentType))
                    .col(ts(TradeDocuments::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RepCommissions::Table)
                    .if_not_exists()
                    .col(uuid_pk(RepCommissions::Id))
                    .col(uuid_col(RepCommissions::OrderId).unique_key().to_owned())
                    .col(uuid_col(RepCommissions::SalesRepId))
                    .col(
                        ColumnDef::new(RepCommissions::Rate)
                            .decimal_len(6, 4)
                            .not_null(),
                    )
                    .col(money(RepCommissions::OrderTotal))
                    .col(money(RepCommissions::VendorCost))
                    .col(money(RepCommissions::Margin))
                    .col(money(RepCommissions::Amount))
                    .col(status_col(RepCommissions::Status))
                    .col(ts(RepCommissions::CreatedAt))
                    .col(ts(RepCommissions::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RepCommissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeCustomers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeTiers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesReps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    Phone,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SalesReps {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    CommissionRate,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TradeTiers {
    Table,
    Id,
    Name,
    DiscountPercent,
    SpendThreshold,
    Rank,
}

#[derive(DeriveIden)]
enum TradeCustomers {
    Table,
    Id,
    Email,
    CompanyName,
    PasswordHash,
    TierId,
    DiscountPercent,
    LifetimeSpend,
    AssignedRepId,
    IsApproved,
    IsActive,
    StripeCustomerId,
    StripeSubscriptionId,
    SubscriptionStatus,
    SubscriptionExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TradeDocuments {
    Table,
    Id,
    TradeCustomerId,
    FileName,
    ObjectKey,
    ContentType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RepCommissions {
    Table,
    Id,
    OrderId,
    SalesRepId,
    Rate,
    OrderTotal,
    VendorCost,
    Margin,
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}
