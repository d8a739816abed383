pub mod prelude;

pub mod game_progress;
pub mod game_results;
pub mod tz_events;
pub mod user_stats;
pub mod users;
