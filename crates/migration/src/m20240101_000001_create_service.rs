//! Create `service` table.
//! Stores catalog entries for downstream services, soft-deleted via
//! `deleted_at`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(string_len(Service::Name, 128).not_null())
                    .col(string_len_null(Service::Description, 512))
                    .col(string_len_null(Service::BaseUrl, 512))
                    .col(string_len_null(Service::DisplayName, 128))
                    .col(string_len_null(Service::IconUrl, 512))
                    .col(boolean(Service::IsVisible).not_null().default(true))
                    .col(boolean(Service::IsVisibleByRole).not_null().default(false))
                    .col(timestamp_with_time_zone(Service::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Service::UpdatedAt).not_null())
                    .col(timestamp_with_time_zone_null(Service::DeletedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Service::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Service {
    Table,
    Id,
    Name,
    Description,
    BaseUrl,
    DisplayName,
    IconUrl,
    IsVisible,
    IsVisibleByRole,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
