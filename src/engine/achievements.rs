use log::{debug, info};
use std::collections::HashSet;

use crate::db::store::GamificationStore;
use crate::error::StoreError;
use crate::models::{
    Achievement, InsertOutcome, RequirementType, UnlockedAchievement, UserGamificationState,
};

/// Does `snapshot` satisfy the achievement's requirement?
pub fn qualifies(achievement: &Achievement, snapshot: &UserGamificationState) -> bool {
    let value = achievement.requirement_value;
    match achievement.requirement_type {
        RequirementType::StreakDays => snapshot.current_streak as u64 >= value,
        RequirementType::GoalReached => snapshot.total_walking_entries >= value,
        RequirementType::WeightLogged => snapshot.total_weight_entries >= value,
        RequirementType::ChallengesCompleted => snapshot.total_challenges_completed >= value,
        RequirementType::FirstSteps => snapshot.total_walking_entries >= 1,
        RequirementType::FirstWeight => snapshot.total_weight_entries >= 1,
        RequirementType::FirstChallenge => snapshot.total_challenges_completed >= 1,
        RequirementType::Level => snapshot.level as u64 >= value,
    }
}

/// Catalog entries that qualify and are not yet unlocked, in catalog order.
pub fn candidates<'a>(
    snapshot: &UserGamificationState,
    catalog: &'a [Achievement],
    already_unlocked: &[UnlockedAchievement],
) -> Vec<&'a Achievement> {
    let unlocked: HashSet<&str> = already_unlocked
        .iter()
        .map(|u| u.achievement_id.as_str())
        .collect();

    catalog
        .iter()
        .filter(|a| !unlocked.contains(a.id.as_str()))
        .filter(|a| qualifies(a, snapshot))
        .collect()
}

/// A store write failed part way through `evaluate`. `unlocked` holds the
/// rows that did land; their rows exist now, so they must still be shown.
#[derive(Debug)]
pub struct Interrupted {
    pub unlocked: Vec<Achievement>,
    pub source: StoreError,
}

/// Grant every newly qualifying achievement and return the ones this call
/// actually inserted. A row that already exists in the store (another
/// session got there first) is skipped silently. With `grant_xp` each row
/// carries its XP reward in the same store write.
pub fn evaluate<S: GamificationStore + ?Sized>(
    store: &S,
    snapshot: &UserGamificationState,
    catalog: &[Achievement],
    already_unlocked: &[UnlockedAchievement],
    grant_xp: bool,
) -> Result<Vec<Achievement>, Interrupted> {
    let mut newly_unlocked = Vec::new();

    for achievement in candidates(snapshot, catalog, already_unlocked) {
        let reward = if grant_xp { achievement.xp_reward } else { 0 };
        let outcome = match store.insert_unlocked(&snapshot.user_id, &achievement.id, reward) {
            Ok(outcome) => outcome,
            Err(source) => {
                return Err(Interrupted {
                    unlocked: newly_unlocked,
                    source,
                })
            }
        };
        match outcome {
            InsertOutcome::Inserted => {
                info!("{} unlocked {}", snapshot.user_id, achievement.id);
                newly_unlocked.push(achievement.clone());
            }
            InsertOutcome::AlreadyExists => {
                debug!("{} already had {}", snapshot.user_id, achievement.id);
            }
        }
    }

    Ok(newly_unlocked)
}

pub fn total_reward(achievements: &[Achievement]) -> u64 {
    achievements
        .iter()
        .fold(0u64, |acc, a| acc.saturating_add(a.xp_reward))
}
