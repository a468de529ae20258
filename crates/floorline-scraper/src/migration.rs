use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct ScraperMigration;

#[async_trait::async_trait]
impl MigrationTrait for ScraperMigration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VendorSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorSources::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VendorSources::VendorId).uuid())
                    .col(
                        ColumnDef::new(VendorSources::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorSources::ScraperKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorSources::CronSchedule).string_len(64))
                    .col(
                        ColumnDef::new(VendorSources::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VendorSources::Config)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorSources::LastScrapedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VendorSources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScrapeJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapeJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScrapeJobs::VendorSourceId).uuid().not_null())
                    .col(ColumnDef::new(ScrapeJobs::Status).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ScrapeJobs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScrapeJobs::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScrapeJobs::ProductsFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapeJobs::ProductsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ScrapeJobs::Errors).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        // the job lock: one running row per source, enforced by the database
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uniq_scrape_jobs_running \
                 ON scrape_jobs (vendor_source_id) WHERE status = 'running'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScrapeJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VendorSources::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VendorSources {
    Table,
    Id,
    VendorId,
    Name,
    ScraperKey,
    CronSchedule,
    IsActive,
    Config,
    LastScrapedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ScrapeJobs {
    Table,
    Id,
    VendorSourceId,
    Status,
    StartedAt,
    CompletedAt,
    ProductsFound,
    ProductsUpdated,
    Errors,
}
