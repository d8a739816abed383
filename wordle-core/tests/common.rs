use chrono::NaiveDate;
use wordle_types::{GameResult, User, UserId};

/// Creates a test user with the given id and provider name
pub fn create_test_user(id: UserId, name: &str) -> User {
    User {
        id,
        provider: "github".to_string(),
        provider_id: format!("gh-{}", id),
        display_name: name.to_string(),
        custom_name: None,
        avatar_url: Some(format!("https://avatars.example.com/{}.png", id)),
        banned: false,
        created_at: "2025-01-01T00:00:00+00:00".to_string(),
    }
}

/// Creates a banned test user
pub fn create_banned_user(id: UserId, name: &str) -> User {
    User {
        banned: true,
        ..create_test_user(id, name)
    }
}

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(offset as u64)
}

/// A win on the given day offset
pub fn win(user_id: UserId, day_offset: u32, guesses: i32) -> GameResult {
    GameResult {
        user_id,
        date: day(day_offset),
        won: true,
        guesses: Some(guesses),
        hard_mode: false,
    }
}

/// A hard-mode win on the given day offset
pub fn hard_win(user_id: UserId, day_offset: u32, guesses: i32) -> GameResult {
    GameResult {
        hard_mode: true,
        ..win(user_id, day_offset, guesses)
    }
}

/// A loss on the given day offset
pub fn loss(user_id: UserId, day_offset: u32) -> GameResult {
    GameResult {
        user_id,
        date: day(day_offset),
        won: false,
        guesses: None,
        hard_mode: false,
    }
}

/// Consecutive daily wins with the same guess count
pub fn win_run(user_id: UserId, days: u32, guesses: i32) -> Vec<GameResult> {
    (0..days).map(|d| win(user_id, d, guesses)).collect()
}
