use serde::{Serialize, de::DeserializeOwned};
use warp::http::StatusCode;

use crate::auth::AuthService;
use wordle_core::NameError;
use wordle_persistence::repositories::UserRepository;
use wordle_types::{ErrorResponse, User, UserId};

pub mod admin;
pub mod auth;
pub mod game;

pub type ApiReply = warp::reply::WithStatus<warp::reply::Json>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NameError> for ApiError {
    fn from(err: NameError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Log a storage failure and answer 500 with `message`.
pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |err| {
        tracing::error!("{}: {}", message, err);
        ApiError::Internal(message)
    }
}

pub fn respond<T: Serialize>(result: Result<T, ApiError>) -> ApiReply {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(err.to_string())),
            err.status(),
        ),
    }
}

/// Bodies are decoded by hand so malformed JSON gets our 400 instead of a
/// warp rejection.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::bad_request("Invalid request body")
    })
}

/// Resolve the session token to a stored user. Bad or expired tokens count
/// as anonymous.
pub async fn current_user(
    session: Option<&str>,
    auth_service: &AuthService,
    user_repository: &UserRepository,
) -> Result<Option<User>, ApiError> {
    let Some(token) = session else {
        return Ok(None);
    };

    let user_id = match auth_service.validate_session(token) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!("Ignoring session token: {}", e);
            return Ok(None);
        }
    };

    user_repository
        .find_by_id(user_id)
        .await
        .map_err(internal("Failed to load user"))
}

pub async fn require_user(
    session: Option<&str>,
    auth_service: &AuthService,
    user_repository: &UserRepository,
) -> Result<User, ApiError> {
    current_user(session, auth_service, user_repository)
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub async fn require_admin(
    session: Option<&str>,
    admin_user_id: UserId,
    auth_service: &AuthService,
    user_repository: &UserRepository,
) -> Result<User, ApiError> {
    match current_user(session, auth_service, user_repository).await? {
        Some(user) if user.id == admin_user_id => Ok(user),
        _ => Err(ApiError::Forbidden),
    }
}

/// `?limit=` parsing shared by the list endpoints: out of range or
/// unparseable values fall back to the default.
pub fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|limit| (1..=max).contains(limit))
        .unwrap_or(default)
}
