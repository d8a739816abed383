use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::entities::{prelude::*, tz_events};
use wordle_core::PreviousEvent;
use wordle_types::UserId;

/// One row of the append-only timezone log.
#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneEventRecord {
    pub user_id: UserId,
    pub server_time: DateTime<Utc>,
    pub client_time: String,
    pub tz_offset: i32,
    pub ip: String,
    pub endpoint: String,
}

pub struct TimezoneEventRepository {
    db: DatabaseConnection,
}

impl TimezoneEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The most recently recorded event for a user.
    pub async fn latest_for_user(&self, user_id: UserId) -> Result<Option<PreviousEvent>> {
        let event = TzEvents::find()
            .filter(tz_events::Column::UserId.eq(user_id))
            .order_by_desc(tz_events::Column::Id)
            .one(&self.db)
            .await?;

        Ok(event.map(|model| PreviousEvent {
            server_time: model.server_utc,
            tz_offset: model.tz_offset,
        }))
    }

    pub async fn record(&self, event: TimezoneEventRecord) -> Result<()> {
        let event_model = tz_events::ActiveModel {
            user_id: ActiveValue::Set(event.user_id),
            server_utc: ActiveValue::Set(event.server_time),
            client_time: ActiveValue::Set(event.client_time),
            tz_offset: ActiveValue::Set(event.tz_offset),
            ip: ActiveValue::Set(event.ip),
            endpoint: ActiveValue::Set(event.endpoint),
            ..Default::default()
        };

        TzEvents::insert(event_model).exec(&self.db).await?;
        Ok(())
    }

    #[cfg(any(test, feature = "test-util"))]
    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let count = TzEvents::find()
            .filter(tz_events::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::repositories::{OAuthProfile, UserRepository};
    use chrono::{TimeDelta, TimeZone};
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> (TimezoneEventRepository, UserId) {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let user = UserRepository::new(db.clone())
            .upsert_oauth_user(OAuthProfile {
                provider: "google".to_string(),
                provider_id: "g-1".to_string(),
                display_name: "Traveller".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();
        (TimezoneEventRepository::new(db), user.id)
    }

    fn event(user_id: UserId, server_time: DateTime<Utc>, tz_offset: i32) -> TimezoneEventRecord {
        TimezoneEventRecord {
            user_id,
            server_time,
            client_time: server_time.to_rfc3339(),
            tz_offset,
            ip: "203.0.113.5".to_string(),
            endpoint: "result".to_string(),
        }
    }

    #[tokio::test]
    async fn test_latest_event() {
        let (repo, user_id) = setup_test_db().await;
        assert!(repo.latest_for_user(user_id).await.unwrap().is_none());

        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        repo.record(event(user_id, start, 0)).await.unwrap();
        repo.record(event(user_id, start + TimeDelta::minutes(5), -60))
            .await
            .unwrap();

        let latest = repo.latest_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(latest.tz_offset, -60);
        assert_eq!(latest.server_time, start + TimeDelta::minutes(5));
        assert_eq!(repo.count_for_user(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_events_are_per_user() {
        let (repo, user_id) = setup_test_db().await;

        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        repo.record(event(user_id, now, 120)).await.unwrap();

        assert!(repo.latest_for_user(user_id + 1).await.unwrap().is_none());
        assert_eq!(repo.count_for_user(user_id + 1).await.unwrap(), 0);
    }
}
