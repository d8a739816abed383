use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::auth::{OAuthProvider, ProviderCredentials};
use wordle_types::UserId;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: Option<String>,
    pub public_base_url: String,
    pub static_dir: String,
    /// Empty disables the flat audit file; flags are still logged.
    pub cheat_log_path: String,
    pub admin_user_id: UserId,
    pub geo_api_url: String,
    pub profanity_api_url: String,
    pub outbound_timeout_seconds: u64,
    pub oauth_credentials: HashMap<OAuthProvider, ProviderCredentials>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/wordle.db?mode=rwc".to_string()),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),
            cheat_log_path: env::var("CHEAT_LOG_PATH")
                .unwrap_or_else(|_| "./data/cheatlog.txt".to_string()),
            admin_user_id: env::var("ADMIN_USER_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .expect("Invalid ADMIN_USER_ID"),
            geo_api_url: env::var("GEO_API_URL")
                .unwrap_or_else(|_| "http://ip-api.com/json".to_string()),
            profanity_api_url: env::var("PROFANITY_API_URL")
                .unwrap_or_else(|_| "https://vector.profanity.dev".to_string()),
            outbound_timeout_seconds: env::var("OUTBOUND_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("Invalid OUTBOUND_TIMEOUT_SECONDS"),
            oauth_credentials: Self::oauth_credentials_from_env(),
        }
    }

    /// Providers whose client id is set; the rest answer 503 on login.
    fn oauth_credentials_from_env() -> HashMap<OAuthProvider, ProviderCredentials> {
        OAuthProvider::ALL
            .into_iter()
            .filter_map(|provider| {
                let prefix = provider.env_prefix();
                let client_id = env::var(format!("{}_CLIENT_ID", prefix)).ok()?;
                if client_id.is_empty() {
                    return None;
                }
                let client_secret =
                    env::var(format!("{}_CLIENT_SECRET", prefix)).unwrap_or_default();
                Some((
                    provider,
                    ProviderCredentials {
                        client_id,
                        client_secret,
                    },
                ))
            })
            .collect()
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_seconds)
    }

    pub fn cheat_log_path(&self) -> Option<&str> {
        Some(self.cheat_log_path.as_str()).filter(|path| !path.is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
