pub mod achievements;
pub mod clock;
pub mod goal_days;
pub mod level;
pub mod pending;
pub mod stats;
pub mod streak;
pub mod tracker;
pub mod treat;
pub mod trends;

pub use clock::{Clock, SystemClock};
pub use tracker::{ActivityOutcome, BoardEntry, StateView, Tracker};
