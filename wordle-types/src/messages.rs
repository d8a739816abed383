use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

/// Local clock reading reported by the browser alongside a game update.
///
/// `tz_offset` follows `Date.prototype.getTimezoneOffset`: minutes, positive
/// west of UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimezoneClaim {
    pub client_time: String,
    pub tz_offset: i32,
}

fn claim_from(client_time: &Option<String>, tz_offset: Option<i32>) -> Option<TimezoneClaim> {
    match (client_time, tz_offset) {
        (Some(client_time), Some(tz_offset)) if !client_time.is_empty() => Some(TimezoneClaim {
            client_time: client_time.clone(),
            tz_offset,
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitResultRequest {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub won: bool,
    #[serde(default)]
    pub guesses: Option<i32>,
    #[serde(default)]
    pub hard_mode: bool,
    #[serde(default)]
    pub client_time: Option<String>,
    #[serde(default)]
    pub tz_offset: Option<i32>,
}

impl SubmitResultRequest {
    pub fn timezone_claim(&self) -> Option<TimezoneClaim> {
        claim_from(&self.client_time, self.tz_offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaveProgressRequest {
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[serde(default)]
    pub guesses: Vec<String>,
    #[serde(rename = "hardMode", default)]
    pub hard_mode: bool,
    #[serde(rename = "gameOver", default)]
    pub game_over: bool,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub client_time: Option<String>,
    #[serde(default)]
    pub tz_offset: Option<i32>,
}

impl SaveProgressRequest {
    pub fn timezone_claim(&self) -> Option<TimezoneClaim> {
        claim_from(&self.client_time, self.tz_offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DisplayNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BanRequest {
    pub user_id: UserId,
    pub ban: bool,
}

/// Acknowledgement for write endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tz_warning: Option<bool>,
}

impl OkResponse {
    pub fn ok() -> Self {
        OkResponse {
            ok: true,
            tz_warning: None,
        }
    }

    pub fn with_warning(flagged: bool) -> Self {
        OkResponse {
            ok: true,
            tz_warning: flagged.then_some(true),
        }
    }
}
