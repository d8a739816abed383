use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use reqwest::{Client, Url, header::ACCEPT};
use serde::{Deserialize, Serialize};

use wordle_persistence::repositories::OAuthProfile;
use wordle_types::UserId;

/// Sessions stay valid for 30 days.
pub const SESSION_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Github,
    Discord,
    Google,
}

pub struct ProviderEndpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub userinfo_url: &'static str,
    pub scopes: &'static str,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 3] = [
        OAuthProvider::Github,
        OAuthProvider::Discord,
        OAuthProvider::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Github => "github",
            OAuthProvider::Discord => "discord",
            OAuthProvider::Google => "google",
        }
    }

    /// Prefix of the `<PREFIX>_CLIENT_ID` / `<PREFIX>_CLIENT_SECRET` variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            OAuthProvider::Github => "GITHUB",
            OAuthProvider::Discord => "DISCORD",
            OAuthProvider::Google => "GOOGLE",
        }
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        match self {
            OAuthProvider::Github => ProviderEndpoints {
                authorize_url: "https://github.com/login/oauth/authorize",
                token_url: "https://github.com/login/oauth/access_token",
                userinfo_url: "https://api.github.com/user",
                scopes: "read:user",
            },
            OAuthProvider::Discord => ProviderEndpoints {
                authorize_url: "https://discord.com/api/oauth2/authorize",
                token_url: "https://discord.com/api/oauth2/token",
                userinfo_url: "https://discord.com/api/users/@me",
                scopes: "identify",
            },
            OAuthProvider::Google => ProviderEndpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo",
                scopes: "https://www.googleapis.com/auth/userinfo.profile",
            },
        }
    }

    /// Map a userinfo response onto our profile shape.
    pub fn parse_profile(&self, info: &serde_json::Value) -> Option<OAuthProfile> {
        let string_field = |key: &str| info.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let (provider_id, display_name, avatar_url) = match self {
            OAuthProvider::Github => {
                // GitHub ids are JSON numbers
                let id = match info.get("id")? {
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    _ => return None,
                };
                (id, string_field("login"), string_field("avatar_url"))
            }
            OAuthProvider::Discord => {
                let id = string_field("id")?;
                let avatar = string_field("avatar")
                    .filter(|hash| !hash.is_empty())
                    .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", id, hash));
                (id, string_field("username"), avatar)
            }
            OAuthProvider::Google => (
                string_field("id")?,
                string_field("name"),
                string_field("picture"),
            ),
        };

        if provider_id.is_empty() {
            return None;
        }

        Some(OAuthProfile {
            provider: self.as_str().to_string(),
            provider_id,
            display_name: display_name.unwrap_or_default(),
            avatar_url: avatar_url.filter(|url| !url.is_empty()),
        })
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OAuthProvider::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or_else(|| AuthError::UnknownProvider(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

pub struct AuthService {
    client: Client,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    credentials: HashMap<OAuthProvider, ProviderCredentials>,
    public_base_url: String,
}

impl AuthService {
    pub fn new(
        jwt_secret: &[u8],
        credentials: HashMap<OAuthProvider, ProviderCredentials>,
        public_base_url: String,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("wordle-six-server")
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build OAuth HTTP client, using defaults: {:?}", e);
                Client::new()
            });

        Self {
            client,
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            credentials,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Random value for the `oauth_state` CSRF cookie.
    pub fn new_state_token() -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes())
    }

    pub fn issue_session(&self, user_id: UserId) -> Result<String, AuthError> {
        self.issue_session_at(user_id, Utc::now())
    }

    pub fn issue_session_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: user_id,
            exp: (now + TimeDelta::days(SESSION_LIFETIME_DAYS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign session token: {:?}", e);
            AuthError::SigningFailed
        })
    }

    /// Verify a session token and return the user id it carries.
    pub fn validate_session(&self, token: &str) -> Result<UserId, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims.sub)
    }

    pub fn callback_url(&self, provider: OAuthProvider) -> String {
        format!("{}/auth/{}/callback", self.public_base_url, provider)
    }

    fn credentials_for(&self, provider: OAuthProvider) -> Result<&ProviderCredentials, AuthError> {
        self.credentials
            .get(&provider)
            .filter(|c| !c.client_id.is_empty())
            .ok_or(AuthError::ProviderNotConfigured(provider))
    }

    /// The provider URL the browser is sent to for consent.
    pub fn authorize_url(&self, provider: OAuthProvider, state: &str) -> Result<String, AuthError> {
        let credentials = self.credentials_for(provider)?;
        let endpoints = provider.endpoints();
        let url = Url::parse_with_params(
            endpoints.authorize_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", self.callback_url(provider).as_str()),
                ("scope", endpoints.scopes),
                ("state", state),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| {
            tracing::error!("Failed to build authorize URL for {}: {:?}", provider, e);
            AuthError::ProviderNotConfigured(provider)
        })?;
        Ok(url.to_string())
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, provider: OAuthProvider, code: &str) -> Result<String, AuthError> {
        let credentials = self.credentials_for(provider)?;
        let callback_url = self.callback_url(provider);
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(provider.endpoints().token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Token exchange with {} failed: {:?}", provider, e);
                AuthError::TokenExchangeFailed
            })?;

        let status = response.status();
        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!("Unreadable token response from {} ({}): {:?}", provider, status, e);
            AuthError::TokenExchangeFailed
        })?;

        match token.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(access_token),
            None => {
                tracing::warn!(
                    "No access token from {} ({}): {}",
                    provider,
                    status,
                    token.error.unwrap_or_default()
                );
                Err(AuthError::TokenExchangeFailed)
            }
        }
    }

    pub async fn fetch_profile(
        &self,
        provider: OAuthProvider,
        access_token: &str,
    ) -> Result<OAuthProfile, AuthError> {
        let response = self
            .client
            .get(provider.endpoints().userinfo_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("User info fetch from {} failed: {:?}", provider, e);
                AuthError::ProfileFetchFailed
            })?;

        if !response.status().is_success() {
            tracing::warn!("User info endpoint of {} returned {}", provider, response.status());
            return Err(AuthError::ProfileFetchFailed);
        }

        let info: serde_json::Value = response.json().await.map_err(|e| {
            tracing::warn!("Unreadable user info from {}: {:?}", provider, e);
            AuthError::ProfileFetchFailed
        })?;

        provider.parse_profile(&info).ok_or_else(|| {
            tracing::warn!("User info from {} is missing an id", provider);
            AuthError::ProfileFetchFailed
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("{0} OAuth not configured")]
    ProviderNotConfigured(OAuthProvider),
    #[error("Token exchange failed")]
    TokenExchangeFailed,
    #[error("Failed to fetch user info")]
    ProfileFetchFailed,
    #[error("Failed to create session")]
    SigningFailed,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}
