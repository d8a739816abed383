use std::sync::LazyLock;

use regex::Regex;

pub const MAX_NAME_CHARS: usize = 20;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ALLOWED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_ \-]+$").unwrap());

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NameError {
    #[error("Name must be 1-{MAX_NAME_CHARS} characters")]
    InvalidLength,
    #[error("Name can only contain letters, numbers, spaces, hyphens, and underscores")]
    InvalidCharacters,
}

/// Trim the name and collapse inner whitespace runs to a single space.
pub fn sanitize_display_name(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Sanitize a requested display name and check it against the naming rules.
pub fn validate_display_name(raw: &str) -> Result<String, NameError> {
    let name = sanitize_display_name(raw);
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_CHARS {
        return Err(NameError::InvalidLength);
    }
    if !ALLOWED_NAME.is_match(&name) {
        return Err(NameError::InvalidCharacters);
    }
    Ok(name)
}
