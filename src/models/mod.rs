pub mod achievement;
pub mod activity;
pub mod gamification;

pub use achievement::{Achievement, InsertOutcome, Rarity, RequirementType, UnlockedAchievement};
pub use activity::{WalkingRecord, WeightRecord};
pub use gamification::{StatKey, StatePatch, StreakPatch, UserGamificationState};
