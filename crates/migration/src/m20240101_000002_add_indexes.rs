//! Indexes for the `service` table.
//!
//! Name uniqueness among non-deleted rows is the invariant the application
//! layer's check-then-insert cannot guarantee under concurrency; the partial
//! unique index is the actual guarantee, so it is raw SQL (sea-query has no
//! builder for partial indexes).
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_service_name_active \
                 ON service (name) WHERE deleted_at IS NULL",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_created_at")
                    .table(Service::Table)
                    .col(Service::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_is_visible")
                    .table(Service::Table)
                    .col(Service::IsVisible)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_service_is_visible").table(Service::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_service_created_at").table(Service::Table).to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_service_name_active")
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Service {
    Table,
    CreatedAt,
    IsVisible,
}
