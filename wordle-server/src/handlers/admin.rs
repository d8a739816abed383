use std::sync::Arc;

use warp::hyper::body::Bytes;
use warp::{Rejection, Reply};

use super::game::LimitQuery;
use super::{ApiError, internal, parse_body, parse_limit, require_admin, respond};
use crate::auth::AuthService;
use crate::config::Config;
use wordle_persistence::repositories::UserRepository;
use wordle_types::{BanRequest, OkResponse, UserListEntry, UserListResponse};

pub const DEFAULT_USER_LIST_LIMIT: usize = 100;
pub const MAX_USER_LIST_LIMIT: usize = 500;

pub async fn ban_user(
    session: Option<String>,
    body: Bytes,
    config: Arc<Config>,
    auth_service: Arc<AuthService>,
    user_repository: Arc<UserRepository>,
) -> Result<impl Reply, Rejection> {
    let result = async {
        let admin = require_admin(
            session.as_deref(),
            config.admin_user_id,
            &auth_service,
            &user_repository,
        )
        .await?;

        let request: BanRequest = parse_body(&body)?;
        if request.user_id == admin.id {
            return Err(ApiError::bad_request("Cannot ban yourself"));
        }

        let updated = user_repository
            .set_banned(request.user_id, request.ban)
            .await
            .map_err(internal("Failed to update user"))?;
        if !updated {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        tracing::info!(
            admin_id = admin.id,
            user_id = request.user_id,
            banned = request.ban,
            "Ban flag updated"
        );
        Ok::<_, ApiError>(OkResponse::ok())
    }
    .await;

    Ok(respond(result))
}

pub async fn list_users(
    session: Option<String>,
    query: LimitQuery,
    config: Arc<Config>,
    auth_service: Arc<AuthService>,
    user_repository: Arc<UserRepository>,
) -> Result<impl Reply, Rejection> {
    let result = async {
        require_admin(
            session.as_deref(),
            config.admin_user_id,
            &auth_service,
            &user_repository,
        )
        .await?;

        let limit = parse_limit(
            query.limit.as_deref(),
            DEFAULT_USER_LIST_LIMIT,
            MAX_USER_LIST_LIMIT,
        );
        let users = user_repository
            .list_users(limit as u64)
            .await
            .map_err(internal("Failed to list users"))?;

        Ok::<_, ApiError>(UserListResponse {
            users: users.into_iter().map(UserListEntry::from).collect(),
        })
    }
    .await;

    Ok(respond(result))
}
