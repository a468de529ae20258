use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct AuthMigration;

fn session_table<T, O>(table: T, owner: O) -> TableCreateStatement
where
    T: Iden + 'static,
    O: Iden + 'static,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
        .col(ColumnDef::new(owner).uuid().not_null())
        .col(
            ColumnDef::new(Common::TokenHash)
                .string_len(64)
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(Common::ExpiresAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Common::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for AuthMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StaffUsers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(StaffUsers::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(StaffUsers::PasswordHash)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StaffUsers::Name).string_len(255).not_null())
                    .col(ColumnDef::new(StaffUsers::Role).string_len(32).not_null())
                    .col(
                        ColumnDef::new(StaffUsers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Common::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StaffUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let mut staff_sessions = session_table(StaffSessions::Table, StaffSessions::StaffId);
        staff_sessions.col(
            ColumnDef::new(StaffSessions::RememberMe)
                .boolean()
                .not_null()
                .default(false),
        );
        manager.create_table(staff_sessions).await?;
        manager
            .create_table(session_table(RepSessions::Table, RepSessions::RepId))
            .await?;
        manager
            .create_table(session_table(
                TradeSessions::Table,
                TradeSessions::TradeCustomerId,
            ))
            .await?;
        manager
            .create_table(session_table(
                CustomerSessions::Table,
                CustomerSessions::CustomerId,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TwoFactorCodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TwoFactorCodes::StaffId).uuid().not_null())
                    .col(
                        ColumnDef::new(TwoFactorCodes::Code)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Common::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TwoFactorCodes::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Common::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrustedDevices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TrustedDevices::StaffId).uuid().not_null())
                    .col(
                        ColumnDef::new(TrustedDevices::FingerprintHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Common::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Common::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_trusted_devices_staff_fingerprint")
                    .table(TrustedDevices::Table)
                    .col(TrustedDevices::StaffId)
                    .col(TrustedDevices::FingerprintHash)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrustedDevices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TwoFactorCodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomerSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RepSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StaffSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StaffUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Common {
    Id,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StaffUsers {
    Table,
    Email,
    PasswordHash,
    Name,
    Role,
    IsActive,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StaffSessions {
    Table,
    StaffId,
    RememberMe,
}

#[derive(DeriveIden)]
enum RepSessions {
    Table,
    RepId,
}

#[derive(DeriveIden)]
enum TradeSessions {
    Table,
    TradeCustomerId,
}

#[derive(DeriveIden)]
enum CustomerSessions {
    Table,
    CustomerId,
}

#[derive(DeriveIden)]
enum TwoFactorCodes {
    Table,
    StaffId,
    Code,
    UsedAt,
}

#[derive(DeriveIden)]
enum TrustedDevices {
    Table,
    StaffId,
    FingerprintHash,
}
