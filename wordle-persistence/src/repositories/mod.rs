pub mod game_repository;
pub mod tz_event_repository;
pub mod user_repository;

pub use game_repository::GameRepository;
pub use tz_event_repository::{TimezoneEventRecord, TimezoneEventRepository};
pub use user_repository::{OAuthProfile, UserRepository};
