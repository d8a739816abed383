use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use warp::Filter;

use crate::auth::AuthService;
use crate::cheat_detector::CheatDetectionService;
use crate::config::Config;
use crate::handlers::game::{DateQuery, GameContext, LimitQuery};
use crate::profanity::ProfanityFilter;
use wordle_persistence::repositories::{GameRepository, UserRepository};

pub mod auth;
pub mod cheat_detector;
pub mod config;
pub mod geo;
pub mod handlers;
pub mod profanity;

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Session token from the `session` cookie, or a bearer token for API clients.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(handlers::auth::SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .map(|cookie: Option<String>, header: Option<String>| {
            cookie.filter(|c| !c.is_empty()).or_else(|| {
                header.and_then(|h| h.strip_prefix("Bearer ").map(str::to_string))
            })
        })
}

/// Client address as seen through Cloudflare or a reverse proxy.
pub fn resolve_client_ip(
    cf_connecting_ip: Option<&str>,
    forwarded_for: Option<&str>,
    remote: Option<SocketAddr>,
) -> Option<IpAddr> {
    if let Some(ip) = cf_connecting_ip.and_then(|v| v.trim().parse().ok()) {
        return Some(ip);
    }
    if let Some(ip) = forwarded_for
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
    {
        return Some(ip);
    }
    remote.map(|addr| addr.ip())
}

fn client_ip() -> impl Filter<Extract = (Option<IpAddr>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("cf-connecting-ip")
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .and(warp::addr::remote())
        .map(
            |cf: Option<String>, forwarded: Option<String>, remote: Option<SocketAddr>| {
                resolve_client_ip(cf.as_deref(), forwarded.as_deref(), remote)
            },
        )
}

fn json_body() -> impl Filter<Extract = (warp::hyper::body::Bytes,), Error = warp::Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

pub fn create_routes(
    config: Arc<Config>,
    auth_service: Arc<AuthService>,
    user_repository: Arc<UserRepository>,
    game_repository: Arc<GameRepository>,
    cheat_detector: Arc<CheatDetectionService>,
    profanity_filter: Arc<dyn ProfanityFilter>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let config_filter = warp::any().map({
        let config = config.clone();
        move || config.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let user_repository_filter = warp::any().map({
        let user_repository = user_repository.clone();
        move || user_repository.clone()
    });

    let game_repository_filter = warp::any().map({
        let game_repository = game_repository.clone();
        move || game_repository.clone()
    });

    let game_context_filter = warp::any().map({
        let ctx = GameContext {
            auth_service: auth_service.clone(),
            user_repository: user_repository.clone(),
            game_repository: game_repository.clone(),
            cheat_detector: cheat_detector.clone(),
        };
        move || ctx.clone()
    });

    let profanity_filter = warp::any().map(move || profanity_filter.clone());

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Must precede the /auth/{provider} route
    let auth_me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(session_token())
        .and(auth_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handlers::auth::me);

    let auth_logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and_then(handlers::auth::logout);

    let auth_start = warp::path!("auth" / String)
        .and(warp::get())
        .and(auth_filter.clone())
        .and_then(handlers::auth::start_login);

    let auth_callback = warp::path!("auth" / String / "callback")
        .and(warp::get())
        .and(warp::query::<std::collections::HashMap<String, String>>())
        .and(warp::cookie::optional::<String>(
            handlers::auth::STATE_COOKIE,
        ))
        .and(auth_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handlers::auth::finish_login);

    let leaderboard = warp::path!("api" / "leaderboard")
        .and(warp::get())
        .and(warp::query::<LimitQuery>())
        .and(game_repository_filter.clone())
        .and_then(handlers::game::leaderboard);

    let submit_result = warp::path!("api" / "result")
        .and(warp::post())
        .and(session_token())
        .and(client_ip())
        .and(json_body())
        .and(game_context_filter.clone())
        .and_then(handlers::game::submit_result);

    let game_state = warp::path!("api" / "game-state")
        .and(warp::get())
        .and(session_token())
        .and(warp::query::<DateQuery>())
        .and(game_context_filter.clone())
        .and_then(handlers::game::game_state);

    let save_progress = warp::path!("api" / "save-progress")
        .and(warp::post())
        .and(session_token())
        .and(client_ip())
        .and(json_body())
        .and(game_context_filter.clone())
        .and_then(handlers::game::save_progress);

    let get_stats = warp::path!("api" / "user-stats")
        .and(warp::get())
        .and(session_token())
        .and(game_context_filter.clone())
        .and_then(handlers::game::get_stats);

    let save_stats = warp::path!("api" / "user-stats")
        .and(warp::post())
        .and(session_token())
        .and(json_body())
        .and(game_context_filter.clone())
        .and_then(handlers::game::save_stats);

    let display_name = warp::path!("api" / "display-name")
        .and(warp::post())
        .and(session_token())
        .and(json_body())
        .and(game_context_filter.clone())
        .and(profanity_filter)
        .and_then(handlers::game::set_display_name);

    let ban = warp::path!("api" / "ban")
        .and(warp::post())
        .and(session_token())
        .and(json_body())
        .and(config_filter.clone())
        .and(auth_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handlers::admin::ban_user);

    let users = warp::path!("api" / "users")
        .and(warp::get())
        .and(session_token())
        .and(warp::query::<LimitQuery>())
        .and(config_filter.clone())
        .and(auth_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handlers::admin::list_users);

    // Everything else is the single-page front end
    let static_files = warp::get().and(warp::fs::dir(config.static_dir.clone()));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST"]);

    let auth_routes = auth_me.or(auth_logout).or(auth_callback).or(auth_start);
    let api_routes = leaderboard
        .or(submit_result)
        .or(game_state)
        .or(save_progress)
        .or(get_stats)
        .or(save_stats)
        .or(display_name)
        .or(ban)
        .or(users);

    health
        .or(auth_routes)
        .or(api_routes)
        .or(static_files)
        .with(cors)
        .with(warp::log("wordle_six"))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::geo::GeoLocator;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::time::Duration;
    use wordle_core::GeoTimezone;
    use wordle_persistence::repositories::{OAuthProfile, TimezoneEventRepository};
    use wordle_types::User;

    struct NoGeo;

    #[async_trait]
    impl GeoLocator for NoGeo {
        async fn locate(&self, _ip: IpAddr) -> Option<GeoTimezone> {
            None
        }
    }

    /// Flags any name containing "darn".
    struct WordListFilter;

    #[async_trait]
    impl ProfanityFilter for WordListFilter {
        async fn is_profane(&self, text: &str) -> bool {
            text.to_lowercase().contains("darn")
        }
    }

    struct TestApp {
        auth_service: Arc<AuthService>,
        user_repository: Arc<UserRepository>,
        game_repository: Arc<GameRepository>,
        events: Arc<TimezoneEventRepository>,
        config: Arc<Config>,
        profanity_filter: Arc<dyn ProfanityFilter>,
        cheat_detector: Arc<CheatDetectionService>,
    }

    impl TestApp {
        fn routes(
            &self,
        ) -> impl Filter<Extract = impl warp::Reply + use<>, Error = warp::Rejection> + Clone + use<> {
            create_routes(
                self.config.clone(),
                self.auth_service.clone(),
                self.user_repository.clone(),
                self.game_repository.clone(),
                self.cheat_detector.clone(),
                self.profanity_filter.clone(),
            )
        }

        async fn user(&self, provider_id: &str, name: &str) -> (User, String) {
            let user = self
                .user_repository
                .upsert_oauth_user(OAuthProfile {
                    provider: "github".to_string(),
                    provider_id: provider_id.to_string(),
                    display_name: name.to_string(),
                    avatar_url: Some(format!("https://cdn.example.com/{}.png", provider_id)),
                })
                .await
                .unwrap();
            let cookie = format!("session={}", self.auth_service.issue_session(user.id).unwrap());
            (user, cookie)
        }
    }

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: Some("integration-secret".to_string()),
            public_base_url: "https://wordle.example.com".to_string(),
            static_dir: "./static".to_string(),
            cheat_log_path: String::new(),
            admin_user_id: 1,
            geo_api_url: "http://127.0.0.1:9".to_string(),
            profanity_api_url: "http://127.0.0.1:9".to_string(),
            outbound_timeout_seconds: 1,
            oauth_credentials: HashMap::new(),
        }
    }

    async fn create_test_app() -> TestApp {
        let config = Arc::new(test_config());

        // Create in-memory database for tests
        let db = wordle_persistence::connection::connect_to_memory_database()
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();

        let user_repository = Arc::new(UserRepository::new(db.clone()));
        let game_repository = Arc::new(GameRepository::new(db.clone()));
        let events = Arc::new(TimezoneEventRepository::new(db));
        let auth_service = Arc::new(AuthService::new(
            b"integration-secret",
            config.oauth_credentials.clone(),
            config.public_base_url.clone(),
            Duration::from_secs(1),
        ));
        let cheat_detector = Arc::new(CheatDetectionService::new(
            events.clone(),
            user_repository.clone(),
            Arc::new(NoGeo),
            None,
        ));

        TestApp {
            auth_service,
            user_repository,
            game_repository,
            events,
            config,
            profanity_filter: Arc::new(WordListFilter),
            cheat_detector,
        }
    }

    fn body_json(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app.routes())
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_me_without_session() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/auth/me")
            .reply(&app.routes())
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!({"user": null}));
    }

    #[tokio::test]
    async fn test_me_with_cookie_and_bearer() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "octocat").await;

        let response = warp::test::request()
            .method("GET")
            .path("/auth/me")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(
            body_json(&response),
            json!({"user": {
                "id": user.id,
                "provider": "github",
                "display_name": "octocat",
                "avatar_url": "https://cdn.example.com/1.png",
                "is_new": true,
                "banned": false
            }})
        );

        let token = app.auth_service.issue_session(user.id).unwrap();
        let response = warp::test::request()
            .method("GET")
            .path("/auth/me")
            .header("authorization", format!("Bearer {}", token))
            .reply(&app.routes())
            .await;
        assert_eq!(body_json(&response)["user"]["id"], json!(user.id));
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path("/auth/logout")
            .reply(&app.routes())
            .await;

        assert_eq!(response.status(), 200);
        let cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_login_unknown_and_unconfigured_provider() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/auth/myspace")
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);

        let response = warp::test::request()
            .method("GET")
            .path("/auth/github")
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_callback_rejects_bad_state_and_missing_code() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/auth/github/callback?state=forged&code=abc")
            .header("cookie", "oauth_state=expected")
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(response.body(), "Invalid state parameter");

        let response = warp::test::request()
            .method("GET")
            .path("/auth/github/callback?state=expected")
            .header("cookie", "oauth_state=expected")
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(response.body(), "No code provided");
    }

    #[tokio::test]
    async fn test_game_endpoints_require_session() {
        let app = create_test_app().await;

        for (method, path) in [
            ("POST", "/api/result"),
            ("GET", "/api/game-state?date=2025-03-01"),
            ("POST", "/api/save-progress"),
            ("GET", "/api/user-stats"),
            ("POST", "/api/display-name"),
        ] {
            let response = warp::test::request()
                .method(method)
                .path(path)
                .header("cookie", "session=not-a-token")
                .body("{}")
                .reply(&app.routes())
                .await;
            assert_eq!(response.status(), 401, "{} {}", method, path);
            assert_eq!(body_json(&response), json!({"error": "Not authenticated"}));
        }
    }

    #[tokio::test]
    async fn test_submit_result_and_leaderboard() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "solver").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/result")
            .header("cookie", &cookie)
            .json(&json!({"date": "2025-03-01", "won": true, "guesses": 3, "hard_mode": false}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!({"ok": true}));

        let response = warp::test::request()
            .method("GET")
            .path("/api/leaderboard")
            .reply(&app.routes())
            .await;
        let body = body_json(&response);
        let entries = body["leaderboard"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["user_id"], json!(user.id));
        assert_eq!(entries[0]["rank"], json!(1));
        assert_eq!(entries[0]["games_played"], json!(1));
    }

    #[tokio::test]
    async fn test_submit_result_validation() {
        let app = create_test_app().await;
        let (_, cookie) = app.user("1", "solver").await;

        for body in [
            json!({"date": "2025-03-01", "won": true, "guesses": 7}),
            json!({"date": "2025-03-01", "won": true}),
        ] {
            let response = warp::test::request()
                .method("POST")
                .path("/api/result")
                .header("cookie", &cookie)
                .json(&body)
                .reply(&app.routes())
                .await;
            assert_eq!(response.status(), 400);
        }

        let response = warp::test::request()
            .method("POST")
            .path("/api/result")
            .header("cookie", &cookie)
            .json(&json!({"date": "03/01/2025", "won": false}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);

        let response = warp::test::request()
            .method("POST")
            .path("/api/result")
            .header("cookie", &cookie)
            .body("not json")
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response), json!({"error": "Invalid request body"}));
    }

    #[tokio::test]
    async fn test_skewed_clock_sets_warning_but_keeps_result() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "time-traveller").await;
        let future = (chrono::Utc::now() + chrono::TimeDelta::hours(30)).to_rfc3339();

        let response = warp::test::request()
            .method("POST")
            .path("/api/result")
            .header("cookie", &cookie)
            .header("x-forwarded-for", "203.0.113.50, 10.0.0.1")
            .json(&json!({
                "date": "2025-03-01",
                "won": true,
                "guesses": 2,
                "hard_mode": true,
                "client_time": future,
                "tz_offset": 0
            }))
            .reply(&app.routes())
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!({"ok": true, "tz_warning": true}));
        assert_eq!(app.events.count_for_user(user.id).await.unwrap(), 1);
        assert_eq!(
            app.game_repository.results_for_user(user.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_progress_round_trip_and_finished_game_result() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "grinder").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/game-state?date=2025-03-02")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(
            body_json(&response),
            json!({"guesses": [], "hardMode": false, "gameOver": false, "won": false})
        );

        let response = warp::test::request()
            .method("POST")
            .path("/api/save-progress")
            .header("cookie", &cookie)
            .json(&json!({
                "date": "2025-03-02",
                "guesses": ["crane", "slate", "plate"],
                "hardMode": true,
                "gameOver": true,
                "won": true
            }))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!({"ok": true}));

        let response = warp::test::request()
            .method("GET")
            .path("/api/game-state?date=2025-03-02")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(
            body_json(&response),
            json!({"guesses": ["crane", "slate", "plate"], "hardMode": true, "gameOver": true, "won": true})
        );

        let results = app.game_repository.results_for_user(user.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].guesses, Some(3));
        assert!(results[0].hard_mode);
    }

    #[tokio::test]
    async fn test_progress_rejects_bad_input() {
        let app = create_test_app().await;
        let (_, cookie) = app.user("1", "grinder").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/game-state")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response), json!({"error": "Date is required"}));

        let response = warp::test::request()
            .method("GET")
            .path("/api/game-state?date=tomorrow")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);

        let response = warp::test::request()
            .method("POST")
            .path("/api/save-progress")
            .header("cookie", &cookie)
            .json(&json!({
                "date": "2025-03-02",
                "guesses": ["a", "b", "c", "d", "e", "f", "g"]
            }))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_finished_win_without_guesses_is_rejected() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "grinder").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/save-progress")
            .header("cookie", &cookie)
            .json(&json!({
                "date": "2025-03-02",
                "guesses": [],
                "gameOver": true,
                "won": true
            }))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response), json!({"error": "Invalid guess count"}));

        assert!(app.game_repository.results_for_user(user.id).await.unwrap().is_empty());
        let response = warp::test::request()
            .method("GET")
            .path("/api/game-state?date=2025-03-02")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(body_json(&response)["gameOver"], json!(false));

        let response = warp::test::request()
            .method("GET")
            .path("/api/leaderboard")
            .reply(&app.routes())
            .await;
        assert_eq!(body_json(&response)["leaderboard"], json!([]));

        // A finished loss needs no guess count
        let response = warp::test::request()
            .method("POST")
            .path("/api/save-progress")
            .header("cookie", &cookie)
            .json(&json!({
                "date": "2025-03-02",
                "guesses": ["crane", "slate", "plate", "grate", "crate", "irate"],
                "gameOver": true,
                "won": false
            }))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 200);
        let results = app.game_repository.results_for_user(user.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].won);
        assert_eq!(results[0].guesses, None);
    }

    #[tokio::test]
    async fn test_user_stats_defaults_and_overwrite() {
        let app = create_test_app().await;
        let (_, cookie) = app.user("1", "statistician").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/user-stats")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        let body = body_json(&response);
        assert_eq!(body["played"], json!(0));
        assert_eq!(body["distribution"], json!([0, 0, 0, 0, 0, 0]));

        let stats = json!({
            "played": 5, "won": 4, "playedHard": 1, "wonHard": 1,
            "currentStreak": 2, "maxStreak": 3,
            "distribution": [0, 1, 2, 1, 0, 0],
            "lastDate": "2025-03-02", "hardMode": true
        });
        let response = warp::test::request()
            .method("POST")
            .path("/api/user-stats")
            .header("cookie", &cookie)
            .json(&stats)
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 200);

        let response = warp::test::request()
            .method("GET")
            .path("/api/user-stats")
            .header("cookie", &cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(body_json(&response), stats);

        let response = warp::test::request()
            .method("POST")
            .path("/api/user-stats")
            .header("cookie", &cookie)
            .json(&json!({"played": 1, "won": 1, "currentStreak": 1, "maxStreak": 1, "distribution": [1]}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_display_name_rules() {
        let app = create_test_app().await;
        let (user, cookie) = app.user("1", "provider-name").await;

        let set_name = |name: &'static str| {
            warp::test::request()
                .method("POST")
                .path("/api/display-name")
                .header("cookie", cookie.clone())
                .json(&json!({ "name": name }))
        };

        let response = set_name("   ").reply(&app.routes()).await;
        assert_eq!(response.status(), 400);

        let response = set_name("this name is far too long").reply(&app.routes()).await;
        assert_eq!(response.status(), 400);

        let response = set_name("<script>").reply(&app.routes()).await;
        assert_eq!(response.status(), 400);

        let response = set_name("Darn It").reply(&app.routes()).await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response), json!({"error": "That name is not allowed"}));

        let response = set_name("  Word   Smith ").reply(&app.routes()).await;
        assert_eq!(response.status(), 200);
        let stored = app.user_repository.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.custom_name.as_deref(), Some("Word Smith"));

        app.user_repository.set_banned(user.id, true).await.unwrap();
        let response = set_name("Another").reply(&app.routes()).await;
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_admin_ban_and_user_listing() {
        let app = create_test_app().await;
        let (admin, admin_cookie) = app.user("1", "admin").await;
        let (player, player_cookie) = app.user("2", "player").await;
        assert_eq!(admin.id, app.config.admin_user_id);

        let response = warp::test::request()
            .method("POST")
            .path("/api/ban")
            .header("cookie", &player_cookie)
            .json(&json!({"user_id": admin.id, "ban": true}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 403);

        let response = warp::test::request()
            .method("POST")
            .path("/api/ban")
            .header("cookie", &admin_cookie)
            .json(&json!({"user_id": admin.id, "ban": true}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response), json!({"error": "Cannot ban yourself"}));

        let response = warp::test::request()
            .method("POST")
            .path("/api/ban")
            .header("cookie", &admin_cookie)
            .json(&json!({"user_id": player.id, "ban": true}))
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 200);
        assert!(app.user_repository.find_by_id(player.id).await.unwrap().unwrap().banned);

        let response = warp::test::request()
            .method("GET")
            .path("/api/users?limit=9999")
            .header("cookie", &admin_cookie)
            .reply(&app.routes())
            .await;
        let body = body_json(&response);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["id"], json!(admin.id));
        assert_eq!(users[1]["banned"], json!(true));

        let response = warp::test::request()
            .method("GET")
            .path("/api/users")
            .header("cookie", &player_cookie)
            .reply(&app.routes())
            .await;
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_banned_player_leaves_leaderboard() {
        let app = create_test_app().await;
        let (_, admin_cookie) = app.user("1", "admin").await;
        let (player, player_cookie) = app.user("2", "player").await;

        warp::test::request()
            .method("POST")
            .path("/api/result")
            .header("cookie", &player_cookie)
            .json(&json!({"date": "2025-03-01", "won": true, "guesses": 4}))
            .reply(&app.routes())
            .await;

        warp::test::request()
            .method("POST")
            .path("/api/ban")
            .header("cookie", &admin_cookie)
            .json(&json!({"user_id": player.id, "ban": true}))
            .reply(&app.routes())
            .await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/leaderboard?limit=abc")
            .reply(&app.routes())
            .await;
        assert_eq!(body_json(&response), json!({"leaderboard": []}));
    }

    #[test]
    fn test_client_ip_resolution_order() {
        let remote: SocketAddr = "10.0.0.2:5555".parse().unwrap();

        assert_eq!(
            resolve_client_ip(Some("198.51.100.1"), Some("203.0.113.1"), Some(remote)),
            Some("198.51.100.1".parse().unwrap())
        );
        assert_eq!(
            resolve_client_ip(None, Some(" 203.0.113.1 , 10.0.0.1"), Some(remote)),
            Some("203.0.113.1".parse().unwrap())
        );
        assert_eq!(
            resolve_client_ip(Some("garbage"), None, Some(remote)),
            Some("10.0.0.2".parse().unwrap())
        );
        assert_eq!(resolve_client_ip(None, None, None), None);
    }
}
