use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::goal_days::{consecutive_goal_days, GoalDays};
use crate::engine::pending::PendingUpdate;
use crate::error::{EngineError, EngineResult};
use crate::models::{StatePatch, UserGamificationState, WalkingRecord};

/// Percent of the way to a treat, clamped to 0..=100.
pub fn progress_toward_treat(current: u32, threshold: u32) -> f64 {
    if threshold == 0 {
        return 100.0;
    }
    (100.0 * current as f64 / threshold as f64).clamp(0.0, 100.0)
}

pub fn is_treat_available(current: u32, threshold: u32) -> bool {
    current >= threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreatProgress {
    pub goal_days: GoalDays,
    pub threshold: u32,
    pub progress_percent: f64,
    pub available: bool,
}

/// Goal days earned since the last claim. Days on or before the claim date
/// were already paid out and are ignored.
pub fn treat_progress(
    state: &UserGamificationState,
    records: &[WalkingRecord],
    daily_goal_minutes: u32,
    threshold: u32,
    today: NaiveDate,
) -> TreatProgress {
    let eligible: Vec<WalkingRecord> = records
        .iter()
        .filter(|r| state.last_treat_claimed_on.is_none_or(|claimed| r.date > claimed))
        .cloned()
        .collect();
    let goal_days = consecutive_goal_days(&eligible, daily_goal_minutes, today);

    TreatProgress {
        goal_days,
        threshold,
        progress_percent: progress_toward_treat(goal_days.count, threshold),
        available: is_treat_available(goal_days.count, threshold),
    }
}

/// Claim an available treat. Resets the baseline to `today` and bumps the
/// lifetime treat counter.
pub fn claim_treat(
    state: &UserGamificationState,
    progress: &TreatProgress,
    today: NaiveDate,
) -> EngineResult<PendingUpdate> {
    if !progress.available {
        return Err(EngineError::TreatUnavailable {
            progress: progress.goal_days.count,
            threshold: progress.threshold,
        });
    }

    let mut tentative = state.clone();
    tentative.treats_claimed = tentative.treats_claimed.saturating_add(1);
    tentative.last_treat_claimed_on = Some(today);

    let patch = StatePatch {
        treats_delta: 1,
        last_treat_claimed_on: Some(today),
        ..Default::default()
    };
    Ok(PendingUpdate::new(tentative, patch))
}
