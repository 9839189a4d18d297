//! In-memory store used by engine tests.

use chrono::{NaiveDate, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::db::store::GamificationStore;
use crate::engine::level::level_from_total_xp;
use crate::error::StoreError;
use crate::models::{
    Achievement, InsertOutcome, StatePatch, UnlockedAchievement, UserGamificationState,
    WalkingRecord,
};

#[derive(Default)]
pub struct MemoryStore {
    states: RefCell<HashMap<String, UserGamificationState>>,
    catalog: Vec<Achievement>,
    unlocked: RefCell<HashMap<String, Vec<UnlockedAchievement>>>,
    walking: RefCell<HashMap<String, Vec<WalkingRecord>>>,
    /// (successful writes still allowed, failure reason)
    failure: RefCell<Option<(usize, String)>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<Achievement>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// The next `save_state` or `insert_unlocked` fails with `Unavailable`.
    pub fn fail_next_write(&self, reason: &str) {
        self.fail_after_writes(0, reason);
    }

    /// Let `successes` more writes through, then fail one.
    pub fn fail_after_writes(&self, successes: usize, reason: &str) {
        *self.failure.borrow_mut() = Some((successes, reason.to_string()));
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn add_walking(&self, user_id: &str, record: WalkingRecord) {
        self.walking
            .borrow_mut()
            .entry(user_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn stored_state(&self, user_id: &str) -> Option<UserGamificationState> {
        self.states.borrow().get(user_id).cloned()
    }

    pub fn unlocked_ids(&self, user_id: &str) -> Vec<String> {
        self.unlocked
            .borrow()
            .get(user_id)
            .map(|rows| rows.iter().map(|u| u.achievement_id.clone()).collect())
            .unwrap_or_default()
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        let mut failure = self.failure.borrow_mut();
        match failure.take() {
            Some((0, reason)) => return Err(StoreError::Unavailable(reason)),
            Some((n, reason)) => *failure = Some((n - 1, reason)),
            None => {}
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

fn merge(state: &mut UserGamificationState, patch: &StatePatch) {
    state.total_xp += patch.xp_delta;
    state.level = level_from_total_xp(state.total_xp).level;
    state.total_walking_entries += patch.walking_delta;
    state.total_weight_entries += patch.weight_delta;
    state.total_challenges_completed += patch.challenge_delta;
    state.treats_claimed += patch.treats_delta;
    if let Some(streak) = patch.streak {
        state.current_streak = streak.current;
        state.longest_streak = state.longest_streak.max(streak.longest);
        state.last_activity_date = streak.last_activity_date;
    }
    if patch.last_treat_claimed_on.is_some() {
        state.last_treat_claimed_on = patch.last_treat_claimed_on;
    }
}

impl GamificationStore for MemoryStore {
    fn load_state(&self, user_id: &str) -> Result<UserGamificationState, StoreError> {
        Ok(self
            .states
            .borrow_mut()
            .entry(user_id.to_string())
            .or_insert_with(|| UserGamificationState::new(user_id))
            .clone())
    }

    fn save_state(
        &self,
        user_id: &str,
        patch: &StatePatch,
    ) -> Result<UserGamificationState, StoreError> {
        self.take_failure()?;
        let mut states = self.states.borrow_mut();
        let state = states
            .entry(user_id.to_string())
            .or_insert_with(|| UserGamificationState::new(user_id));
        merge(state, patch);
        Ok(state.clone())
    }

    fn load_catalog(&self) -> Result<Vec<Achievement>, StoreError> {
        Ok(self.catalog.clone())
    }

    fn load_unlocked(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>, StoreError> {
        Ok(self
            .unlocked
            .borrow()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_unlocked(
        &self,
        user_id: &str,
        achievement_id: &str,
        xp_reward: u64,
    ) -> Result<InsertOutcome, StoreError> {
        self.take_failure()?;
        let mut unlocked = self.unlocked.borrow_mut();
        let rows = unlocked.entry(user_id.to_string()).or_default();
        if rows.iter().any(|u| u.achievement_id == achievement_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.push(UnlockedAchievement {
            achievement_id: achievement_id.to_string(),
            unlocked_at: Utc::now(),
        });
        let mut states = self.states.borrow_mut();
        let state = states
            .entry(user_id.to_string())
            .or_insert_with(|| UserGamificationState::new(user_id));
        merge(
            state,
            &StatePatch {
                xp_delta: xp_reward,
                ..Default::default()
            },
        );
        Ok(InsertOutcome::Inserted)
    }

    fn load_walking_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<WalkingRecord>, StoreError> {
        Ok(self
            .walking
            .borrow()
            .get(user_id)
            .map(|rows| rows.iter().filter(|r| r.date >= since).cloned().collect())
            .unwrap_or_default())
    }
}
