use std::collections::HashMap;
use std::sync::Arc;

use warp::http::{
    HeaderValue, StatusCode,
    header::{LOCATION, SET_COOKIE},
};
use warp::{Rejection, Reply, reply::Response};

use super::{current_user, respond};
use crate::auth::{AuthError, AuthService, OAuthProvider, SESSION_LIFETIME_DAYS};
use wordle_persistence::repositories::UserRepository;
use wordle_types::{MeResponse, OkResponse, SessionUser};

pub const SESSION_COOKIE: &str = "session";
pub const STATE_COOKIE: &str = "oauth_state";
const STATE_MAX_AGE_SECONDS: i64 = 300;

fn cookie(name: &str, value: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        name, value, max_age
    )
}

pub fn session_cookie(token: &str) -> String {
    cookie(SESSION_COOKIE, token, SESSION_LIFETIME_DAYS * 24 * 60 * 60)
}

fn expired_cookie(name: &str) -> String {
    cookie(name, "", 0)
}

fn error_page(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::html(message.to_string()), status).into_response()
}

fn redirect_with_cookies(location: &str, cookies: &[String]) -> Response {
    let Ok(location) = HeaderValue::from_str(location) else {
        tracing::error!("Refusing to redirect to invalid location {:?}", location);
        return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect");
    };

    let mut response = Response::new(warp::hyper::Body::empty());
    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    response.headers_mut().insert(LOCATION, location);
    for cookie in cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Dropping invalid cookie header: {}", e),
        }
    }
    response
}

/// `GET /auth/{provider}`: start the OAuth dance.
pub async fn start_login(
    provider: String,
    auth_service: Arc<AuthService>,
) -> Result<Response, Rejection> {
    let provider = match provider.parse::<OAuthProvider>() {
        Ok(provider) => provider,
        Err(e) => return Ok(error_page(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let state = AuthService::new_state_token();
    match auth_service.authorize_url(provider, &state) {
        Ok(url) => Ok(redirect_with_cookies(
            &url,
            &[cookie(STATE_COOKIE, &state, STATE_MAX_AGE_SECONDS)],
        )),
        Err(e @ AuthError::ProviderNotConfigured(_)) => {
            Ok(error_page(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()))
        }
        Err(e) => Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    }
}

/// `GET /auth/{provider}/callback`: finish login and set the session cookie.
pub async fn finish_login(
    provider: String,
    query: HashMap<String, String>,
    state_cookie: Option<String>,
    auth_service: Arc<AuthService>,
    user_repository: Arc<UserRepository>,
) -> Result<Response, Rejection> {
    let provider = match provider.parse::<OAuthProvider>() {
        Ok(provider) => provider,
        Err(e) => return Ok(error_page(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let state_matches = match (state_cookie.as_deref(), query.get("state")) {
        (Some(expected), Some(received)) => !expected.is_empty() && expected == received,
        _ => false,
    };
    if !state_matches {
        return Ok(error_page(StatusCode::BAD_REQUEST, "Invalid state parameter"));
    }

    let Some(code) = query.get("code").filter(|code| !code.is_empty()) else {
        return Ok(error_page(StatusCode::BAD_REQUEST, "No code provided"));
    };

    let access_token = match auth_service.exchange_code(provider, code).await {
        Ok(token) => token,
        Err(e) => return Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    };

    let profile = match auth_service.fetch_profile(provider, &access_token).await {
        Ok(profile) => profile,
        Err(e) => return Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    };

    let user = match user_repository.upsert_oauth_user(profile).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to store {} user: {}", provider, e);
            return Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user"));
        }
    };

    let token = match auth_service.issue_session(user.id) {
        Ok(token) => token,
        Err(e) => return Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    };

    tracing::info!(user_id = user.id, %provider, "User signed in");
    Ok(redirect_with_cookies(
        "/",
        &[session_cookie(&token), expired_cookie(STATE_COOKIE)],
    ))
}

pub async fn me(
    session: Option<String>,
    auth_service: Arc<AuthService>,
    user_repository: Arc<UserRepository>,
) -> Result<impl Reply, Rejection> {
    let user = current_user(session.as_deref(), &auth_service, &user_repository).await;
    Ok(respond(user.map(|user| MeResponse {
        user: user.as_ref().map(SessionUser::from),
    })))
}

pub async fn logout() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::with_header(
        warp::reply::json(&OkResponse::ok()),
        SET_COOKIE,
        expired_cookie(SESSION_COOKIE),
    ))
}
