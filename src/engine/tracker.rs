use chrono::Duration;
use log::{debug, info, warn};
use serde::Serialize;

use crate::db::store::GamificationStore;
use crate::engine::achievements::{evaluate, total_reward, Interrupted};
use crate::engine::clock::Clock;
use crate::engine::goal_days::MAX_SCAN_DAYS;
use crate::engine::level::{level_from_total_xp, LevelInfo};
use crate::engine::pending::PendingUpdate;
use crate::engine::stats::{add_xp, increment_stat};
use crate::engine::streak::{correct_streak, update_streak};
use crate::engine::treat::{claim_treat, treat_progress, TreatProgress};
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{Achievement, StatKey, UnlockedAchievement, UserGamificationState};

/// What a logged activity changed, for the celebration output.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityOutcome {
    pub state: UserGamificationState,
    pub xp_awarded: u64,
    pub leveled_up: bool,
    pub levels_gained: u32,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Default)]
struct Unlocks {
    achievements: Vec<Achievement>,
    bonus_xp: u64,
}

/// State as it should be displayed.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub state: UserGamificationState,
    pub level: LevelInfo,
}

/// One row of the achievement board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    pub achievement: Achievement,
    pub unlocked: Option<UnlockedAchievement>,
}

/// Cached engagement state for one user plus the store it came from.
///
/// Every mutation goes through `commit`: the tentative state is shown
/// immediately, the patch is sent, and on failure the cache is replaced by a
/// fresh read.
pub struct Tracker<'a, S: GamificationStore + ?Sized, C: Clock + ?Sized> {
    store: &'a S,
    clock: &'a C,
    state: UserGamificationState,
    grant_achievement_xp: bool,
}

impl<'a, S: GamificationStore + ?Sized, C: Clock + ?Sized> Tracker<'a, S, C> {
    pub fn open(
        store: &'a S,
        clock: &'a C,
        user_id: &str,
        grant_achievement_xp: bool,
    ) -> EngineResult<Self> {
        let state = store.load_state(user_id)?;
        Ok(Self {
            store,
            clock,
            state,
            grant_achievement_xp,
        })
    }

    /// The cached state as last committed. The streak may be stale; use
    /// `view` for display.
    #[cfg(test)]
    pub fn state(&self) -> &UserGamificationState {
        &self.state
    }

    /// Display view. A lapsed streak is shown as 0 and the stored counter
    /// is corrected in the background; a failed correction is only logged.
    pub fn view(&mut self) -> StateView {
        let today = self.clock.today();
        if let Some(pending) = correct_streak(&self.state, today) {
            let shown = pending.tentative.clone();
            debug!(
                "streak for {} lapsed ({} -> 0)",
                self.state.user_id, self.state.current_streak
            );
            if let Err(e) = self.commit(pending) {
                warn!("streak correction for {} failed: {}", shown.user_id, e);
                return Self::view_of(shown);
            }
        }
        Self::view_of(self.state.clone())
    }

    fn view_of(state: UserGamificationState) -> StateView {
        let level = level_from_total_xp(state.total_xp);
        StateView { state, level }
    }

    /// Run the full pipeline for one user action: bump the counter, extend
    /// the streak, award `xp`, then check achievements against the result.
    ///
    /// A store failure before the achievement check rolls back as usual. One
    /// during the check comes back as `EngineError::Incomplete` carrying the
    /// outcome, since the activity and any unlocks already inserted stand.
    pub fn record_activity(&mut self, key: StatKey, xp: u64) -> EngineResult<ActivityOutcome> {
        let start_level = self.state.level;

        self.commit(increment_stat(&self.state, key)?)?;

        if key.counts_toward_streak() {
            // asked after the increment round trip, not before
            let today = self.clock.today();
            self.commit(update_streak(&self.state, today))?;
        }

        self.commit(add_xp(&self.state, xp)?.pending)?;

        // a challenge leaves the streak alone, so it can still be lapsed here
        if let Some(pending) = correct_streak(&self.state, self.clock.today()) {
            self.commit(pending)?;
        }

        let mut unlocks = Unlocks::default();
        let interrupted = self.unlock_achievements(&mut unlocks).err();

        let leveled_up = self.state.level > start_level;
        if leveled_up {
            info!("{} reached level {}", self.state.user_id, self.state.level);
        }

        let outcome = ActivityOutcome {
            state: self.state.clone(),
            xp_awarded: xp.saturating_add(unlocks.bonus_xp),
            leveled_up,
            levels_gained: self.state.level.saturating_sub(start_level),
            new_achievements: unlocks.achievements,
        };

        match interrupted {
            None => Ok(outcome),
            Some(source) => {
                warn!(
                    "achievement check for {} interrupted: {}",
                    outcome.state.user_id, source
                );
                Err(EngineError::Incomplete {
                    outcome: Box::new(outcome),
                    source,
                })
            }
        }
    }

    /// Evaluate the catalog against the cached state. When achievement XP is
    /// granted, the reward can itself qualify level achievements, so evaluation
    /// repeats until nothing new unlocks. Each pass unlocks at least one
    /// catalog entry, which bounds the loop by the catalog size.
    ///
    /// `unlocks` is filled as rows land, so it stays accurate when a store
    /// failure ends the loop early.
    fn unlock_achievements(&mut self, unlocks: &mut Unlocks) -> Result<(), StoreError> {
        let catalog = self.store.load_catalog()?;
        let mut unlocked = self.store.load_unlocked(&self.state.user_id)?;

        loop {
            let (new, failure) = match evaluate(
                self.store,
                &self.state,
                &catalog,
                &unlocked,
                self.grant_achievement_xp,
            ) {
                Ok(new) => (new, None),
                Err(Interrupted { unlocked: partial, source }) => (partial, Some(source)),
            };

            let reward = if self.grant_achievement_xp {
                total_reward(&new)
            } else {
                0
            };
            let now = self.clock.now();
            unlocked.extend(new.iter().map(|a| UnlockedAchievement {
                achievement_id: a.id.clone(),
                unlocked_at: now,
            }));
            let done = new.is_empty() || reward == 0;
            unlocks.achievements.extend(new);
            unlocks.bonus_xp = unlocks.bonus_xp.saturating_add(reward);

            if reward > 0 {
                self.refresh_after_reward(reward)?;
            }
            if let Some(source) = failure {
                return Err(source);
            }
            if done {
                return Ok(());
            }
        }
    }

    /// Rewards are added by the store together with the unlock row; pick up
    /// the merged XP and level. If the read fails, mirror the reward locally.
    fn refresh_after_reward(&mut self, reward: u64) -> Result<(), StoreError> {
        match self.store.load_state(&self.state.user_id) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                if let Ok(gain) = add_xp(&self.state, reward) {
                    self.state = gain.pending.tentative;
                }
                Err(e)
            }
        }
    }

    pub fn treat_progress(
        &self,
        daily_goal_minutes: u32,
        threshold: u32,
    ) -> EngineResult<TreatProgress> {
        let today = self.clock.today();
        let since = today - Duration::days(MAX_SCAN_DAYS as i64);
        let records = self
            .store
            .load_walking_records(&self.state.user_id, since)?;
        Ok(treat_progress(
            &self.state,
            &records,
            daily_goal_minutes,
            threshold,
            today,
        ))
    }

    /// Claim an earned treat. Fails with `TreatUnavailable` if the goal-day
    /// run since the last claim is too short.
    pub fn claim_treat(
        &mut self,
        daily_goal_minutes: u32,
        threshold: u32,
    ) -> EngineResult<UserGamificationState> {
        let progress = self.treat_progress(daily_goal_minutes, threshold)?;
        let pending = claim_treat(&self.state, &progress, self.clock.today())?;
        self.commit(pending)?;
        info!(
            "{} claimed treat #{}",
            self.state.user_id, self.state.treats_claimed
        );
        Ok(self.state.clone())
    }

    /// Full catalog with unlock rows attached, in catalog order.
    pub fn achievement_board(&self) -> EngineResult<Vec<BoardEntry>> {
        let catalog = self.store.load_catalog()?;
        let unlocked = self.store.load_unlocked(&self.state.user_id)?;
        Ok(catalog
            .into_iter()
            .map(|achievement| {
                let unlocked = unlocked
                    .iter()
                    .find(|u| u.achievement_id == achievement.id)
                    .cloned();
                BoardEntry {
                    achievement,
                    unlocked,
                }
            })
            .collect())
    }

    fn commit(&mut self, pending: PendingUpdate) -> EngineResult<()> {
        if pending.is_noop() {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.state, pending.tentative.clone());
        match pending.commit(self.store) {
            Ok(authoritative) => {
                self.state = authoritative;
                Ok(())
            }
            Err(e) => {
                warn!("write for {} failed, re-syncing: {}", previous.user_id, e);
                self.resync(previous);
                Err(e.into())
            }
        }
    }

    /// Drop the tentative state and re-read. If the re-read fails too, fall
    /// back to the last committed state rather than keep the tentative one.
    fn resync(&mut self, previous: UserGamificationState) {
        match self.store.load_state(&previous.user_id) {
            Ok(state) => self.state = state,
            Err(e) => {
                warn!("re-sync for {} failed: {}", previous.user_id, e);
                self.state = previous;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::engine::clock::FixedClock;
    use crate::models::{Rarity, RequirementType, StatePatch, StreakPatch, WalkingRecord};
    use chrono::NaiveDate;

    fn achievement(id: &str, requirement_type: RequirementType, value: u64, xp: u64) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            requirement_type,
            requirement_value: value,
            xp_reward: xp,
            rarity: Rarity::Common,
            category: "test".to_string(),
        }
    }

    fn catalog() -> Vec<Achievement> {
        vec![
            achievement("first_steps", RequirementType::FirstSteps, 1, 100),
            achievement("streak_3", RequirementType::StreakDays, 3, 0),
            achievement("level_2", RequirementType::Level, 2, 0),
            achievement("first_challenge", RequirementType::FirstChallenge, 1, 0),
        ]
    }

    fn clock() -> FixedClock {
        FixedClock::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
    }

    fn ids(list: &[Achievement]) -> Vec<&str> {
        list.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_open_creates_state() {
        let store = MemoryStore::new();
        let clock = clock();
        let tracker = Tracker::open(&store, &clock, "u1", true).unwrap();
        assert_eq!(tracker.state(), &UserGamificationState::new("u1"));
        assert!(store.stored_state("u1").is_some());
    }

    #[test]
    fn test_first_walk_pipeline_with_reward_cascade() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        let outcome = tracker.record_activity(StatKey::Walking, 10).unwrap();
        // first_steps grants 100 XP, which reaches level 2 and unlocks level_2
        assert_eq!(ids(&outcome.new_achievements), vec!["first_steps", "level_2"]);
        assert_eq!(outcome.state.total_walking_entries, 1);
        assert_eq!(outcome.state.current_streak, 1);
        assert_eq!(outcome.state.total_xp, 110);
        assert_eq!(outcome.state.level, 2);
        assert_eq!(outcome.xp_awarded, 110);
        assert!(outcome.leveled_up);
        assert_eq!(outcome.levels_gained, 1);
        assert_eq!(store.stored_state("u1").unwrap(), outcome.state);
    }

    #[test]
    fn test_reward_not_granted_when_disabled() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", false).unwrap();

        let outcome = tracker.record_activity(StatKey::Walking, 10).unwrap();
        assert_eq!(ids(&outcome.new_achievements), vec!["first_steps"]);
        assert_eq!(outcome.state.total_xp, 10);
        assert!(!outcome.leveled_up);
    }

    #[test]
    fn test_second_entry_same_day() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        tracker.record_activity(StatKey::Walking, 10).unwrap();
        let outcome = tracker.record_activity(StatKey::Weight, 5).unwrap();
        assert!(outcome.new_achievements.is_empty());
        assert_eq!(outcome.state.current_streak, 1);
        assert_eq!(outcome.state.total_weight_entries, 1);
        assert_eq!(outcome.state.total_xp, 115);
    }

    #[test]
    fn test_streak_achievement_over_three_days() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        tracker.record_activity(StatKey::Walking, 10).unwrap();
        clock.advance_days(1);
        let day2 = tracker.record_activity(StatKey::Walking, 10).unwrap();
        assert!(day2.new_achievements.is_empty());
        clock.advance_days(1);
        let day3 = tracker.record_activity(StatKey::Weight, 5).unwrap();
        assert_eq!(ids(&day3.new_achievements), vec!["streak_3"]);
        assert_eq!(day3.state.current_streak, 3);
        assert_eq!(day3.state.longest_streak, 3);
    }

    #[test]
    fn test_challenge_does_not_touch_streak() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        let outcome = tracker.record_activity(StatKey::Challenge, 50).unwrap();
        assert_eq!(outcome.state.total_challenges_completed, 1);
        assert_eq!(outcome.state.current_streak, 0);
        assert_eq!(outcome.state.last_activity_date, None);
        assert_eq!(ids(&outcome.new_achievements), vec!["first_challenge"]);
    }

    #[test]
    fn test_challenge_checks_validated_streak() {
        let store = MemoryStore::with_catalog(vec![achievement(
            "streak_7",
            RequirementType::StreakDays,
            7,
            0,
        )]);
        let clock = clock();
        store
            .save_state(
                "u1",
                &StatePatch {
                    streak: Some(StreakPatch {
                        current: 7,
                        longest: 7,
                        last_activity_date: Some(clock.today() - Duration::days(10)),
                    }),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        let outcome = tracker.record_activity(StatKey::Challenge, 50).unwrap();
        assert!(outcome.new_achievements.is_empty());
        assert_eq!(outcome.state.current_streak, 0);
        assert_eq!(outcome.state.longest_streak, 7);
        assert_eq!(store.stored_state("u1").unwrap().current_streak, 0);
        assert!(store.unlocked_ids("u1").is_empty());
    }

    #[test]
    fn test_interrupted_unlocks_are_still_reported() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        // increment, streak, xp and the first_steps row land; level_2 fails
        store.fail_after_writes(4, "connection reset");
        let outcome = match tracker.record_activity(StatKey::Walking, 10).unwrap_err() {
            EngineError::Incomplete { outcome, .. } => outcome,
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(ids(&outcome.new_achievements), vec!["first_steps"]);
        assert_eq!(outcome.state.total_xp, 110);
        assert_eq!(outcome.xp_awarded, 110);
        assert!(outcome.leveled_up);
        assert_eq!(store.stored_state("u1").unwrap().total_xp, 110);

        // the next action picks up what was left, and nothing is emitted twice
        let next = tracker.record_activity(StatKey::Walking, 10).unwrap();
        assert_eq!(ids(&next.new_achievements), vec!["level_2"]);
        assert_eq!(next.state.total_xp, 120);
        assert_eq!(store.unlocked_ids("u1"), vec!["first_steps", "level_2"]);
    }

    #[test]
    fn test_failed_increment_rolls_back() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        store.fail_next_write("offline");
        let err = tracker.record_activity(StatKey::Walking, 10).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert_eq!(tracker.state(), &UserGamificationState::new("u1"));
        assert_eq!(store.stored_state("u1").unwrap(), *tracker.state());
    }

    #[test]
    fn test_failure_mid_pipeline_resyncs_to_store() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        // increment lands, streak write fails
        store.fail_after_writes(1, "timeout");
        assert!(tracker.record_activity(StatKey::Walking, 10).is_err());
        let state = tracker.state();
        assert_eq!(state.total_walking_entries, 1);
        assert_eq!(state.current_streak, 0);
        assert_eq!(state.total_xp, 0);
        assert_eq!(*state, store.stored_state("u1").unwrap());
    }

    #[test]
    fn test_view_masks_and_corrects_lapsed_streak() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();
        tracker.record_activity(StatKey::Walking, 10).unwrap();

        clock.advance_days(1);
        assert_eq!(tracker.view().state.current_streak, 1);

        clock.advance_days(1);
        let writes = store.write_count();
        let view = tracker.view();
        assert_eq!(view.state.current_streak, 0);
        assert_eq!(view.state.longest_streak, 1);
        assert_eq!(store.write_count(), writes + 1);
        assert_eq!(store.stored_state("u1").unwrap().current_streak, 0);

        // nothing left to correct
        tracker.view();
        assert_eq!(store.write_count(), writes + 1);
    }

    #[test]
    fn test_view_correction_failure_still_masks() {
        let store = MemoryStore::new();
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();
        tracker.record_activity(StatKey::Walking, 10).unwrap();

        clock.advance_days(5);
        store.fail_next_write("offline");
        let view = tracker.view();
        assert_eq!(view.state.current_streak, 0);
        assert_eq!(store.stored_state("u1").unwrap().current_streak, 1);
    }

    #[test]
    fn test_view_level_info() {
        let store = MemoryStore::new();
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();
        tracker.record_activity(StatKey::Challenge, 175).unwrap();
        let view = tracker.view();
        assert_eq!(view.level.level, 2);
        assert_eq!(view.level.current_level_xp, 75);
    }

    #[test]
    fn test_treat_claim_flow() {
        let store = MemoryStore::new();
        let clock = clock();
        let today = clock.today();
        for n in 0..3 {
            store.add_walking("u1", WalkingRecord::new(today - Duration::days(n), 30));
        }
        let mut tracker = Tracker::open(&store, &clock, "u1", true).unwrap();

        let progress = tracker.treat_progress(30, 3).unwrap();
        assert!(progress.available);
        assert_eq!(progress.goal_days.count, 3);

        let state = tracker.claim_treat(30, 3).unwrap();
        assert_eq!(state.treats_claimed, 1);
        assert_eq!(state.last_treat_claimed_on, Some(today));
        assert!(!tracker.treat_progress(30, 3).unwrap().available);

        assert!(matches!(
            tracker.claim_treat(30, 3),
            Err(EngineError::TreatUnavailable { .. })
        ));
    }

    #[test]
    fn test_achievement_board() {
        let store = MemoryStore::with_catalog(catalog());
        let clock = clock();
        let mut tracker = Tracker::open(&store, &clock, "u1", false).unwrap();
        tracker.record_activity(StatKey::Walking, 10).unwrap();

        let board = tracker.achievement_board().unwrap();
        assert_eq!(board.len(), 4);
        assert!(board[0].unlocked.is_some());
        assert!(board[1..].iter().all(|e| e.unlocked.is_none()));
    }
}
