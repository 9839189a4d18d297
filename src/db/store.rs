use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{
    Achievement, InsertOutcome, StatePatch, UnlockedAchievement, UserGamificationState,
    WalkingRecord,
};

/// Everything the engine needs from persistence. The SQLite repository is
/// the production backend; tests use an in-memory fake.
pub trait GamificationStore {
    /// Read the user's row, creating a zeroed one if none exists.
    fn load_state(&self, user_id: &str) -> Result<UserGamificationState, StoreError>;

    /// Merge `patch` into the stored row and return the result. Counter and
    /// XP fields are added to the stored values; the level is recomputed
    /// from the merged XP.
    fn save_state(
        &self,
        user_id: &str,
        patch: &StatePatch,
    ) -> Result<UserGamificationState, StoreError>;

    /// Active catalog entries in display order.
    fn load_catalog(&self) -> Result<Vec<Achievement>, StoreError>;

    fn load_unlocked(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>, StoreError>;

    /// Insert the unlock row and, when it is new, add `xp_reward` to the
    /// user's XP in the same write. An existing row changes nothing.
    fn insert_unlocked(
        &self,
        user_id: &str,
        achievement_id: &str,
        xp_reward: u64,
    ) -> Result<InsertOutcome, StoreError>;

    /// Walking records dated on or after `since`.
    fn load_walking_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<WalkingRecord>, StoreError>;
}
