use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub type UserId = i64;

/// A registered player, keyed by the OAuth provider that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub provider: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub provider_id: String,
    pub display_name: String,
    pub custom_name: Option<String>,
    pub avatar_url: Option<String>,
    pub banned: bool,
    pub created_at: String, // ISO 8601 string
}

impl User {
    /// Name shown to other players: the custom name wins over the provider name.
    pub fn effective_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.display_name)
    }

    /// A user is "new" until they have picked a custom name.
    pub fn is_new(&self) -> bool {
        self.custom_name.is_none()
    }
}

/// Identity returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionUser {
    pub id: UserId,
    pub provider: String,
    pub display_name: String,
    pub avatar_url: String,
    pub is_new: bool,
    pub banned: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id,
            provider: user.provider.clone(),
            display_name: user.effective_name().to_string(),
            avatar_url: user.avatar_url.clone().unwrap_or_default(),
            is_new: user.is_new(),
            banned: user.banned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MeResponse {
    pub user: Option<SessionUser>,
}

/// Row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserListEntry {
    pub id: UserId,
    pub provider: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub banned: bool,
}

impl From<User> for UserListEntry {
    fn from(user: User) -> Self {
        UserListEntry {
            id: user.id,
            provider: user.provider,
            display_name: user.display_name,
            custom_name: user.custom_name,
            avatar_url: user.avatar_url,
            banned: user.banned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserListResponse {
    pub users: Vec<UserListEntry>,
}
