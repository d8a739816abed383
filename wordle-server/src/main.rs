use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wordle_persistence::{
    connection::connect_and_migrate,
    repositories::{GameRepository, TimezoneEventRepository, UserRepository},
};
use wordle_server::{
    auth::AuthService, cheat_detector::CheatDetectionService, config::Config, create_routes,
    geo::IpApiLocator, profanity::ProfanityApi,
};

/// Secret used when `JWT_SECRET` is unset; sessions die with the process.
fn ephemeral_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Wordle Six server...");

    let config = Config::new();

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let user_repository = Arc::new(UserRepository::new(db.clone()));
    let game_repository = Arc::new(GameRepository::new(db.clone()));
    let event_repository = Arc::new(TimezoneEventRepository::new(db));

    let jwt_secret = config.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET not set, using a random secret; sessions reset on restart");
        ephemeral_secret()
    });
    let auth_service = Arc::new(AuthService::new(
        jwt_secret.as_bytes(),
        config.oauth_credentials.clone(),
        config.public_base_url.clone(),
        config.outbound_timeout(),
    ));
    for provider in config.oauth_credentials.keys() {
        info!("OAuth provider enabled: {}", provider);
    }

    let geo_locator = Arc::new(IpApiLocator::new(
        config.geo_api_url.clone(),
        config.outbound_timeout(),
    ));
    let cheat_detector = Arc::new(CheatDetectionService::new(
        event_repository,
        user_repository.clone(),
        geo_locator,
        config.cheat_log_path().map(PathBuf::from),
    ));
    let profanity_filter = Arc::new(ProfanityApi::new(
        config.profanity_api_url.clone(),
        config.outbound_timeout(),
    ));

    let config = Arc::new(config);
    let routes = create_routes(
        config.clone(),
        auth_service,
        user_repository,
        game_repository,
        cheat_detector,
        profanity_filter,
    );

    info!("Server starting on {}:{}", config.host, config.port);

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!("Invalid HOST {:?}: {}", config.host, e);
            std::process::exit(1);
        }
    };

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, config.port), async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
                .expect("Failed to install SIGINT handler");
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
