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
                    .table(GameResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameResults::UserId).integer().not_null())
                    .col(ColumnDef::new(GameResults::Date).date().not_null())
                    .col(ColumnDef::new(GameResults::Won).boolean().not_null())
                    .col(ColumnDef::new(GameResults::Guesses).integer().null())
                    .col(
                        ColumnDef::new(GameResults::HardMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GameResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_results_user")
                            .from(GameResults::Table, GameResults::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Results are insert-only: the first result for a day wins
        manager
            .create_index(
                Index::create()
                    .name("idx_game_results_user_date")
                    .table(GameResults::Table)
                    .col(GameResults::UserId)
                    .col(GameResults::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GameProgress::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GameProgress::UserId).integer().not_null())
                    .col(ColumnDef::new(GameProgress::Date).date().not_null())
                    .col(
                        ColumnDef::new(GameProgress::Guesses)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(GameProgress::HardMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GameProgress::GameOver)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GameProgress::Won)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(GameProgress::UserId)
                            .col(GameProgress::Date),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_progress_user")
                            .from(GameProgress::Table, GameProgress::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserStats::UserId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(integer_counter(UserStats::Played))
                    .col(integer_counter(UserStats::Won))
                    .col(integer_counter(UserStats::PlayedHard))
                    .col(integer_counter(UserStats::WonHard))
                    .col(integer_counter(UserStats::CurrentStreak))
                    .col(integer_counter(UserStats::MaxStreak))
                    .col(
                        ColumnDef::new(UserStats::Distribution)
                            .text()
                            .not_null()
                            .default("[0,0,0,0,0,0]"),
                    )
                    .col(ColumnDef::new(UserStats::LastDate).string().null())
                    .col(
                        ColumnDef::new(UserStats::HardMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_stats_user")
                            .from(UserStats::Table, UserStats::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameResults::Table).to_owned())
            .await
    }
}

fn integer_counter(column: UserStats) -> ColumnDef {
    ColumnDef::new(column)
        .integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum GameResults {
    Table,
    Id,
    UserId,
    Date,
    Won,
    Guesses,
    HardMode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GameProgress {
    Table,
    UserId,
    Date,
    Guesses,
    HardMode,
    GameOver,
    Won,
}

#[derive(DeriveIden)]
enum UserStats {
    Table,
    UserId,
    Played,
    Won,
    PlayedHard,
    WonHard,
    CurrentStreak,
    MaxStreak,
    Distribution,
    LastDate,
    HardMode,
}
