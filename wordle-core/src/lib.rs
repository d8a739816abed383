pub mod cheat;
pub mod names;
pub mod ranking;

// Re-export main components
pub use cheat::*;
pub use names::*;
pub use ranking::*;
