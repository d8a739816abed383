use std::net::IpAddr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use warp::hyper::body::Bytes;
use warp::{Rejection, Reply};

use super::{ApiError, internal, parse_body, parse_limit, require_user, respond};
use crate::auth::AuthService;
use crate::cheat_detector::{CheatDetectionService, GameEndpoint};
use crate::profanity::ProfanityFilter;
use wordle_core::validate_display_name;
use wordle_persistence::repositories::{GameRepository, UserRepository};
use wordle_types::{
    DisplayNameRequest, GameProgress, GameResult, LeaderboardResponse, MAX_GUESSES, OkResponse,
    SaveProgressRequest, SubmitResultRequest, TimezoneClaim, User, UserStats,
};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// Shared services for the authenticated game endpoints.
#[derive(Clone)]
pub struct GameContext {
    pub auth_service: Arc<AuthService>,
    pub user_repository: Arc<UserRepository>,
    pub game_repository: Arc<GameRepository>,
    pub cheat_detector: Arc<CheatDetectionService>,
}

impl GameContext {
    async fn user(&self, session: Option<&str>) -> Result<User, ApiError> {
        require_user(session, &self.auth_service, &self.user_repository).await
    }

    async fn timezone_warning(
        &self,
        user: &User,
        claim: Option<TimezoneClaim>,
        client_ip: Option<IpAddr>,
        endpoint: GameEndpoint,
    ) -> bool {
        match claim {
            Some(claim) => self
                .cheat_detector
                .inspect(user.id, &claim, client_ip, endpoint)
                .await
                .flagged(),
            None => false,
        }
    }
}

pub async fn leaderboard(
    query: LimitQuery,
    game_repository: Arc<GameRepository>,
) -> Result<impl Reply, Rejection> {
    let limit = parse_limit(
        query.limit.as_deref(),
        DEFAULT_LEADERBOARD_LIMIT,
        MAX_LEADERBOARD_LIMIT,
    );

    let result = game_repository
        .get_leaderboard(limit)
        .await
        .map(|leaderboard| LeaderboardResponse { leaderboard })
        .map_err(internal("Failed to fetch leaderboard"));
    Ok(respond(result))
}

pub async fn submit_result(
    session: Option<String>,
    client_ip: Option<IpAddr>,
    body: Bytes,
    ctx: GameContext,
) -> Result<impl Reply, Rejection> {
    Ok(respond(
        record_result(session.as_deref(), client_ip, &body, &ctx).await,
    ))
}

/// A win needs between 1 and `MAX_GUESSES` guesses; a loss stores none.
fn winning_guess_count(won: bool, guesses: Option<i32>) -> Result<Option<i32>, ApiError> {
    if !won {
        return Ok(None);
    }
    match guesses {
        Some(count) if (1..=MAX_GUESSES as i32).contains(&count) => Ok(Some(count)),
        _ => Err(ApiError::bad_request("Invalid guess count")),
    }
}

async fn record_result(
    session: Option<&str>,
    client_ip: Option<IpAddr>,
    body: &[u8],
    ctx: &GameContext,
) -> Result<OkResponse, ApiError> {
    let user = ctx.user(session).await?;
    let request: SubmitResultRequest = parse_body(body)?;

    let result = GameResult {
        user_id: user.id,
        date: request.date,
        won: request.won,
        guesses: winning_guess_count(request.won, request.guesses)?,
        hard_mode: request.hard_mode,
    };
    let inserted = ctx
        .game_repository
        .insert_result(&result)
        .await
        .map_err(internal("Failed to save result"))?;
    if !inserted {
        tracing::debug!(user_id = user.id, date = %request.date, "Result already recorded");
    }

    let flagged = ctx
        .timezone_warning(&user, request.timezone_claim(), client_ip, GameEndpoint::Result)
        .await;
    Ok(OkResponse::with_warning(flagged))
}

pub async fn game_state(
    session: Option<String>,
    query: DateQuery,
    ctx: GameContext,
) -> Result<impl Reply, Rejection> {
    Ok(respond(load_progress(session.as_deref(), query, &ctx).await))
}

async fn load_progress(
    session: Option<&str>,
    query: DateQuery,
    ctx: &GameContext,
) -> Result<GameProgress, ApiError> {
    let user = ctx.user(session).await?;

    let raw_date = query
        .date
        .filter(|date| !date.is_empty())
        .ok_or_else(|| ApiError::bad_request("Date is required"))?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid date"))?;

    let progress = ctx
        .game_repository
        .get_progress(user.id, date)
        .await
        .map_err(internal("Failed to load progress"))?;
    Ok(progress.unwrap_or_default())
}

pub async fn save_progress(
    session: Option<String>,
    client_ip: Option<IpAddr>,
    body: Bytes,
    ctx: GameContext,
) -> Result<impl Reply, Rejection> {
    Ok(respond(
        store_progress(session.as_deref(), client_ip, &body, &ctx).await,
    ))
}

async fn store_progress(
    session: Option<&str>,
    client_ip: Option<IpAddr>,
    body: &[u8],
    ctx: &GameContext,
) -> Result<OkResponse, ApiError> {
    let user = ctx.user(session).await?;
    let request: SaveProgressRequest = parse_body(body)?;
    if request.guesses.len() > MAX_GUESSES {
        return Err(ApiError::bad_request("Too many guesses"));
    }
    let finished_guesses = if request.game_over {
        winning_guess_count(request.won, Some(request.guesses.len() as i32))?
    } else {
        None
    };

    let progress = GameProgress {
        guesses: request.guesses.clone(),
        hard_mode: request.hard_mode,
        game_over: request.game_over,
        won: request.won,
    };
    ctx.game_repository
        .save_progress(user.id, request.date, &progress)
        .await
        .map_err(internal("Failed to save progress"))?;

    if request.game_over {
        let result = GameResult {
            user_id: user.id,
            date: request.date,
            won: request.won,
            guesses: finished_guesses,
            hard_mode: request.hard_mode,
        };
        // The board is already saved; a missing result only affects ranking
        if let Err(e) = ctx.game_repository.insert_result(&result).await {
            tracing::error!(user_id = user.id, "Failed to record finished game: {}", e);
        }
    }

    let flagged = ctx
        .timezone_warning(
            &user,
            request.timezone_claim(),
            client_ip,
            GameEndpoint::SaveProgress,
        )
        .await;
    Ok(OkResponse::with_warning(flagged))
}

pub async fn get_stats(session: Option<String>, ctx: GameContext) -> Result<impl Reply, Rejection> {
    Ok(respond(load_stats(session.as_deref(), &ctx).await))
}

async fn load_stats(session: Option<&str>, ctx: &GameContext) -> Result<UserStats, ApiError> {
    let user = ctx.user(session).await?;
    let stats = ctx
        .game_repository
        .get_stats(user.id)
        .await
        .map_err(internal("Failed to load stats"))?;
    Ok(stats.unwrap_or_default())
}

pub async fn save_stats(
    session: Option<String>,
    body: Bytes,
    ctx: GameContext,
) -> Result<impl Reply, Rejection> {
    Ok(respond(store_stats(session.as_deref(), &body, &ctx).await))
}

async fn store_stats(
    session: Option<&str>,
    body: &[u8],
    ctx: &GameContext,
) -> Result<OkResponse, ApiError> {
    let user = ctx.user(session).await?;
    let stats: UserStats = parse_body(body)?;
    if stats.distribution.len() != MAX_GUESSES {
        return Err(ApiError::bad_request(format!(
            "Distribution must have {} entries",
            MAX_GUESSES
        )));
    }

    ctx.game_repository
        .save_stats(user.id, &stats)
        .await
        .map_err(internal("Failed to save stats"))?;
    Ok(OkResponse::ok())
}

pub async fn set_display_name(
    session: Option<String>,
    body: Bytes,
    ctx: GameContext,
    profanity_filter: Arc<dyn ProfanityFilter>,
) -> Result<impl Reply, Rejection> {
    Ok(respond(
        rename(session.as_deref(), &body, &ctx, profanity_filter.as_ref()).await,
    ))
}

async fn rename(
    session: Option<&str>,
    body: &[u8],
    ctx: &GameContext,
    profanity_filter: &dyn ProfanityFilter,
) -> Result<OkResponse, ApiError> {
    let user = ctx.user(session).await?;
    if user.banned {
        return Err(ApiError::Forbidden);
    }

    let request: DisplayNameRequest = parse_body(body)?;
    let name = validate_display_name(&request.name)?;
    if profanity_filter.is_profane(&name).await {
        return Err(ApiError::bad_request("That name is not allowed"));
    }

    let updated = ctx
        .user_repository
        .set_custom_name(user.id, &name)
        .await
        .map_err(internal("Failed to update name"))?;
    if !updated {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = user.id, "Display name changed to {:?}", name);
    Ok(OkResponse::ok())
}
