use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{
    sea_query::OnConflict, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    RelationTrait, QuerySelect, JoinType,
};

use crate::entities::{
    game_progress, game_results,
    prelude::GameResults,
    user_stats, users,
};
use crate::repositories::UserRepository;
use wordle_core::RankingEngine;
use wordle_types::{GameProgress, GameResult, LeaderboardEntry, UserId, UserStats, MAX_GUESSES};

/// Daily results, in-progress boards and client-maintained statistics.
pub struct GameRepository {
    db: DatabaseConnection,
}

impl GameRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_result(model: game_results::Model) -> GameResult {
        GameResult {
            user_id: model.user_id,
            date: model.date,
            won: model.won,
            guesses: model.guesses,
            hard_mode: model.hard_mode,
        }
    }

    /// Store a result unless one already exists for that day.
    /// Returns `true` when a row was inserted.
    pub async fn insert_result(&self, result: &GameResult) -> Result<bool> {
        let result_model = game_results::ActiveModel {
            user_id: ActiveValue::Set(result.user_id),
            date: ActiveValue::Set(result.date),
            won: ActiveValue::Set(result.won),
            guesses: ActiveValue::Set(result.guesses),
            hard_mode: ActiveValue::Set(result.hard_mode),
            created_at: ActiveValue::Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let inserted = GameResults::insert(result_model)
            .on_conflict(
                OnConflict::columns([game_results::Column::UserId, game_results::Column::Date])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            tracing::debug!(
                user_id = result.user_id,
                date = %result.date,
                "Result already recorded, keeping the first one"
            );
        }
        Ok(inserted > 0)
    }

    /// A user's results, most recent first.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn results_for_user(&self, user_id: UserId) -> Result<Vec<GameResult>> {
        use sea_orm::QueryOrder;

        let results = GameResults::find()
            .filter(game_results::Column::UserId.eq(user_id))
            .order_by_desc(game_results::Column::Date)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(Self::model_to_result).collect())
    }

    /// Results of every user that is not banned.
    pub async fn results_for_active_users(&self) -> Result<Vec<GameResult>> {
        let results = GameResults::find()
            .join(JoinType::InnerJoin, game_results::Relation::Users.def())
            .filter(users::Column::Banned.eq(false))
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(Self::model_to_result).collect())
    }

    pub async fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let players = UserRepository::new(self.db.clone()).list_active_users().await?;
        let results = self.results_for_active_users().await?;

        Ok(RankingEngine::rank(&players, &results, limit))
    }

    pub async fn get_progress(&self, user_id: UserId, date: NaiveDate) -> Result<Option<GameProgress>> {
        let progress = game_progress::Entity::find_by_id((user_id, date))
            .one(&self.db)
            .await?;

        Ok(progress.map(|model| {
            let guesses = serde_json::from_str(&model.guesses).unwrap_or_else(|err| {
                tracing::warn!(user_id, %date, "Discarding unreadable stored guesses: {}", err);
                Vec::new()
            });
            GameProgress {
                guesses,
                hard_mode: model.hard_mode,
                game_over: model.game_over,
                won: model.won,
            }
        }))
    }

    /// Insert or fully overwrite the board for `(user_id, date)`.
    pub async fn save_progress(
        &self,
        user_id: UserId,
        date: NaiveDate,
        progress: &GameProgress,
    ) -> Result<()> {
        let progress_model = game_progress::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            date: ActiveValue::Set(date),
            guesses: ActiveValue::Set(serde_json::to_string(&progress.guesses)?),
            hard_mode: ActiveValue::Set(progress.hard_mode),
            game_over: ActiveValue::Set(progress.game_over),
            won: ActiveValue::Set(progress.won),
        };

        game_progress::Entity::insert(progress_model)
            .on_conflict(
                OnConflict::columns([game_progress::Column::UserId, game_progress::Column::Date])
                    .update_columns([
                        game_progress::Column::Guesses,
                        game_progress::Column::HardMode,
                        game_progress::Column::GameOver,
                        game_progress::Column::Won,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    pub async fn get_stats(&self, user_id: UserId) -> Result<Option<UserStats>> {
        let stats = user_stats::Entity::find_by_id(user_id).one(&self.db).await?;

        Ok(stats.map(|model| {
            let distribution = serde_json::from_str(&model.distribution).unwrap_or_else(|err| {
                tracing::warn!(user_id, "Resetting unreadable stored distribution: {}", err);
                vec![0; MAX_GUESSES]
            });
            UserStats {
                played: model.played,
                won: model.won,
                played_hard: model.played_hard,
                won_hard: model.won_hard,
                current_streak: model.current_streak,
                max_streak: model.max_streak,
                distribution,
                last_date: model.last_date.unwrap_or_default(),
                hard_mode: model.hard_mode,
            }
        }))
    }

    /// Overwrite the stored statistics with the client's copy.
    pub async fn save_stats(&self, user_id: UserId, stats: &UserStats) -> Result<()> {
        let stats_model = user_stats::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            played: ActiveValue::Set(stats.played),
            won: ActiveValue::Set(stats.won),
            played_hard: ActiveValue::Set(stats.played_hard),
            won_hard: ActiveValue::Set(stats.won_hard),
            current_streak: ActiveValue::Set(stats.current_streak),
            max_streak: ActiveValue::Set(stats.max_streak),
            distribution: ActiveValue::Set(serde_json::to_string(&stats.distribution)?),
            last_date: ActiveValue::Set(
                (!stats.last_date.is_empty()).then(|| stats.last_date.clone()),
            ),
            hard_mode: ActiveValue::Set(stats.hard_mode),
        };

        user_stats::Entity::insert(stats_model)
            .on_conflict(
                OnConflict::column(user_stats::Column::UserId)
                    .update_columns([
                        user_stats::Column::Played,
                        user_stats::Column::Won,
                        user_stats::Column::PlayedHard,
                        user_stats::Column::WonHard,
                        user_stats::Column::CurrentStreak,
                        user_stats::Column::MaxStreak,
                        user_stats::Column::Distribution,
                        user_stats::Column::LastDate,
                        user_stats::Column::HardMode,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }
}
