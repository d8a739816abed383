use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TzEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TzEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TzEvents::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(TzEvents::ServerUtc)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TzEvents::ClientTime).string().not_null())
                    .col(ColumnDef::new(TzEvents::TzOffset).integer().not_null())
                    .col(ColumnDef::new(TzEvents::Ip).string().not_null())
                    .col(ColumnDef::new(TzEvents::Endpoint).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tz_events_user")
                            .from(TzEvents::Table, TzEvents::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Drift detection reads the latest event per user
        manager
            .create_index(
                Index::create()
                    .name("idx_tz_events_user_time")
                    .table(TzEvents::Table)
                    .col(TzEvents::UserId)
                    .col(TzEvents::ServerUtc)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TzEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TzEvents {
    Table,
    Id,
    UserId,
    ServerUtc,
    ClientTime,
    TzOffset,
    Ip,
    Endpoint,
}
