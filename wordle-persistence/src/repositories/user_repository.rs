use anyhow::Result;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{prelude::*, users};
use wordle_types::{User, UserId};

/// Provider identity and profile returned by an OAuth userinfo endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    pub provider: String,
    pub provider_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub(crate) fn model_to_user(model: users::Model) -> User {
        User {
            id: model.id,
            provider: model.provider,
            provider_id: model.provider_id,
            display_name: model.display_name,
            custom_name: model.custom_name,
            avatar_url: model.avatar_url,
            banned: model.banned,
            created_at: model.created_at.to_rfc3339(),
        }
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user_model = Users::find_by_id(id).one(&self.db).await?;
        Ok(user_model.map(Self::model_to_user))
    }

    pub async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>> {
        let user_model = Users::find()
            .filter(users::Column::Provider.eq(provider))
            .filter(users::Column::ProviderId.eq(provider_id))
            .one(&self.db)
            .await?;

        Ok(user_model.map(Self::model_to_user))
    }

    /// Create the user on first login; later logins refresh the provider
    /// display name and avatar but keep the custom name and ban flag.
    pub async fn upsert_oauth_user(&self, profile: OAuthProfile) -> Result<User> {
        let user_model = users::ActiveModel {
            provider: ActiveValue::Set(profile.provider.clone()),
            provider_id: ActiveValue::Set(profile.provider_id.clone()),
            display_name: ActiveValue::Set(profile.display_name),
            avatar_url: ActiveValue::Set(profile.avatar_url),
            banned: ActiveValue::Set(false),
            created_at: ActiveValue::Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        Users::insert(user_model)
            .on_conflict(
                OnConflict::columns([users::Column::Provider, users::Column::ProviderId])
                    .update_columns([users::Column::DisplayName, users::Column::AvatarUrl])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        // Fetch the stored row, whichever branch the upsert took
        self.find_by_provider_identity(&profile.provider, &profile.provider_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve upserted user"))
    }

    /// Returns `false` when no such user exists.
    pub async fn set_custom_name(&self, id: UserId, name: &str) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(users::Column::CustomName, Expr::value(name))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Returns `false` when no such user exists.
    pub async fn set_banned(&self, id: UserId, banned: bool) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(users::Column::Banned, Expr::value(banned))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_users(&self, limit: u64) -> Result<Vec<User>> {
        let users = Users::find()
            .order_by_asc(users::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(Self::model_to_user).collect())
    }

    /// Every user allowed on the leaderboard.
    pub async fn list_active_users(&self) -> Result<Vec<User>> {
        let users = Users::find()
            .filter(users::Column::Banned.eq(false))
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(Self::model_to_user).collect())
    }

    /// Name used in audit logs; empty when the user is unknown.
    pub async fn display_name_of(&self, id: UserId) -> Result<String> {
        Ok(self
            .find_by_id(id)
            .await?
            .map(|user| user.effective_name().to_string())
            .unwrap_or_default())
    }
}
