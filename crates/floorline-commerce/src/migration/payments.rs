use sea_orm_migration::prelude::*;

use super::{money, status_col, string_col, string_null, ts, uuid_col, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct PaymentsMigration;

#[async_trait::async_trait]
impl MigrationTrait for PaymentsMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderPayments::Table)
                    .if_not_exists()
                    .col(uuid_pk(OrderPayments::Id))
                    .col(uuid_col(OrderPayments::OrderId))
                    .col(status_col(OrderPayments::PaymentType))
                    .col(money(OrderPayments::Amount))
                    .col(string_null(OrderPayments::StripePaymentIntentId))
                    .col(string_null(OrderPayments::StripeCheckoutSessionId))
                    .col(string_null(OrderPayments::StripeRefundId))
                    .col(string_null(OrderPayments::Description))
                    .col(status_col(OrderPayments::Status))
                    .col(string_null(OrderPayments::InitiatedBy))
                    .col(ts(OrderPayments::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_payments_order")
                    .table(OrderPayments::Table)
                    .col(OrderPayments::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentRequests::Table)
                    .if_not_exists()
                    .col(uuid_pk(PaymentRequests::Id))
                    .col(uuid_col(PaymentRequests::OrderId))
                    .col(money(PaymentRequests::Amount))
                    .col(string_col(PaymentRequests::Email))
                    .col(
                        ColumnDef::new(PaymentRequests::CheckoutUrl)
                            .string_len(2048)
                            .not_null(),
                    )
                    .col(string_null(PaymentRequests::StripeCheckoutSessionId))
                    .col(status_col(PaymentRequests::Status))
                    .col(ts(PaymentRequests::ExpiresAt))
                    .col(ts(PaymentRequests::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderPayments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrderPayments {
    Table,
    Id,
    OrderId,
    PaymentType,
    Amount,
    StripePaymentIntentId,
    StripeCheckoutSessionId,
    StripeRefundId,
    Description,
    Status,
    InitiatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PaymentRequests {
    Table,
    Id,
    OrderId,
    Amount,
    Email,
    CheckoutUrl,
    StripeCheckoutSessionId,
    Status,
    ExpiresAt,
    CreatedAt,
}
