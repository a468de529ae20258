use sea_orm_migration::prelude::*;

use super::{bool_col, int_col, money, money_null, status_col, string_col, string_null, ts, ts_null, uuid_col, uuid_null, uuid_pk};

#[derive(DeriveMigrationName)]
pub struct PurchasingMigration;

#[async_trait::async_trait]
impl MigrationTrait for PurchasingMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(uuid_pk(PurchaseOrders::Id))
                    .col(uuid_col(PurchaseOrders::OrderId))
                    .col(uuid_col(PurchaseOrders::VendorId))
                    .col(string_col(PurchaseOrders::PoNumber).unique_key().to_owned())
                    .col(status_col(PurchaseOrders::Status))
                    .col(int_col(PurchaseOrders::Revision).default(0).to_owned())
                    .col(bool_col(PurchaseOrders::IsRevised, false))
                    .col(money(PurchaseOrders::Subtotal))
                    .col(uuid_null(PurchaseOrders::ApprovedBy))
                    .col(ts_null(PurchaseOrders::ApprovedAt))
                    .col(string_null(PurchaseOrders::EdiInterchangeId))
                    .col(ColumnDef::new(PurchaseOrders::Notes).text())
                    .col(ts(PurchaseOrders::CreatedAt))
                    .col(ts(PurchaseOrders::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchase_orders_order")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(uuid_pk(PurchaseOrderItems::Id))
                    .col(uuid_col(PurchaseOrderItems::PurchaseOrderId))
                    .col(uuid_null(PurchaseOrderItems::OrderItemId))
                    .col(string_col(PurchaseOrderItems::ProductName))
                    .col(string_null(PurchaseOrderItems::VendorSku))
                    .col(int_col(PurchaseOrderItems::Qty))
                    .col(money(PurchaseOrderItems::CostPerBox))
                    .col(money_null(PurchaseOrderItems::OriginalCost))
                    .col(money_null(PurchaseOrderItems::RetailPrice))
                    .col(money(PurchaseOrderItems::Subtotal))
                    .col(status_col(PurchaseOrderItems::SellBy))
                    .col(status_col(PurchaseOrderItems::Status))
                    .col(ts(PurchaseOrderItems::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_po_items_po")
                    .table(PurchaseOrderItems::Table)
                    .col(PurchaseOrderItems::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoActivityLogs::Table)
                    .if_not_exists()
                    .col(uuid_pk(PoActivityLogs::Id))
                    .col(uuid_col(PoActivityLogs::PurchaseOrderId))
                    .col(string_null(PoActivityLogs::Actor))
                    .col(string_col(PoActivityLogs::Action))
                    .col(
                        ColumnDef::new(PoActivityLogs::Detail)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ts(PoActivityLogs::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EdiTransactions::Table)
                    .if_not_exists()
                    .col(uuid_pk(EdiTransactions::Id))
                    .col(uuid_col(EdiTransactions::PurchaseOrderId))
                    .col(
                        ColumnDef::new(EdiTransactions::TransactionType)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EdiTransactions::InterchangeControlNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(status_col(EdiTransactions::Status))
                    .col(string_null(EdiTransactions::FileName))
                    .col(ts(EdiTransactions::CreatedAt))
                    .col(ts_null(EdiTransactions::SentAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EdiTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoActivityLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    OrderId,
    VendorId,
    PoNumber,
    Status,
    Revision,
    IsRevised,
    Subtotal,
    ApprovedBy,
    ApprovedAt,
    EdiInterchangeId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PurchaseOrderId,
    OrderItemId,
    ProductName,
    VendorSku,
    Qty,
    CostPerBox,
    OriginalCost,
    RetailPrice,
    Subtotal,
    SellBy,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PoActivityLogs {
    Table,
    Id,
    PurchaseOrderId,
    Actor,
    Action,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EdiTransactions {
    Table,
    Id,
    PurchaseOrderId,
    TransactionType,
    InterchangeControlNumber,
    Status,
    FileName,
    CreatedAt,
    SentAt,
}
