use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user engagement state. One row per user, created with zeroed counters
/// the first time the user is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGamificationState {
    pub user_id: String,
    pub total_xp: u64,
    /// Always `level_from_total_xp(total_xp).level` once a write has settled.
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub total_walking_entries: u64,
    pub total_weight_entries: u64,
    pub total_challenges_completed: u64,
    pub treats_claimed: u32,
    pub last_treat_claimed_on: Option<NaiveDate>,
}

impl UserGamificationState {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            total_walking_entries: 0,
            total_weight_entries: 0,
            total_challenges_completed: 0,
            treats_claimed: 0,
            last_treat_claimed_on: None,
        }
    }

    pub fn counter_mut(&mut self, key: StatKey) -> &mut u64 {
        match key {
            StatKey::Walking => &mut self.total_walking_entries,
            StatKey::Weight => &mut self.total_weight_entries,
            StatKey::Challenge => &mut self.total_challenges_completed,
        }
    }
}

/// The lifetime counters that a user action can bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKey {
    Walking,
    Weight,
    Challenge,
}

impl StatKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::Walking => "walking",
            StatKey::Weight => "weight",
            StatKey::Challenge => "challenge",
        }
    }

    /// Storage column holding the lifetime counter.
    pub fn column(&self) -> &'static str {
        match self {
            StatKey::Walking => "total_walking_entries",
            StatKey::Weight => "total_weight_entries",
            StatKey::Challenge => "total_challenges_completed",
        }
    }

    /// Walking and weight entries keep the streak alive; challenges don't.
    pub fn counts_toward_streak(&self) -> bool {
        match self {
            StatKey::Walking | StatKey::Weight => true,
            StatKey::Challenge => false,
        }
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Absolute streak fields; streaks are replaced, not summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPatch {
    pub current: u32,
    pub longest: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// Partial update sent to the store. Counters are deltas applied relative to
/// whatever the store currently holds, so two sessions bumping different
/// counters never overwrite each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePatch {
    pub xp_delta: u64,
    pub walking_delta: u64,
    pub weight_delta: u64,
    pub challenge_delta: u64,
    pub treats_delta: u32,
    pub streak: Option<StreakPatch>,
    pub last_treat_claimed_on: Option<NaiveDate>,
}

impl StatePatch {
    pub fn delta_mut(&mut self, key: StatKey) -> &mut u64 {
        match key {
            StatKey::Walking => &mut self.walking_delta,
            StatKey::Weight => &mut self.weight_delta,
            StatKey::Challenge => &mut self.challenge_delta,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StatePatch::default()
    }
}
