use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

/// Maximum number of guesses in a daily game, and the number of
/// distribution buckets in [`UserStats`].
pub const MAX_GUESSES: usize = 6;

/// Final outcome of one player's daily puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameResult {
    pub user_id: UserId,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub won: bool,
    pub guesses: Option<i32>, // only present on a win
    pub hard_mode: bool,
}

/// In-progress (or finished) board for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameProgress {
    pub guesses: Vec<String>,
    pub hard_mode: bool,
    pub game_over: bool,
    pub won: bool,
}

/// Aggregate statistics, maintained by the client and stored as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStats {
    pub played: i32,
    pub won: i32,
    #[serde(default)]
    pub played_hard: i32,
    #[serde(default)]
    pub won_hard: i32,
    pub current_streak: i32,
    pub max_streak: i32,
    pub distribution: Vec<i32>,
    #[serde(default)]
    pub last_date: String,
    #[serde(default)]
    pub hard_mode: bool,
}

impl Default for UserStats {
    fn default() -> Self {
        UserStats {
            played: 0,
            won: 0,
            played_hard: 0,
            won_hard: 0,
            current_streak: 0,
            max_streak: 0,
            distribution: vec![0; MAX_GUESSES],
            last_date: String::new(),
            hard_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,
    pub weighted_avg: f64,
    pub true_avg: f64,
    pub win_rate: f64,
    pub games_played: u32,
    #[serde(rename = "current_streak")]
    pub streak: u32,
    pub hard_mode_wins: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}
