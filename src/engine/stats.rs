use crate::engine::level::level_from_total_xp;
use crate::engine::pending::PendingUpdate;
use crate::error::{EngineError, EngineResult};
use crate::models::{StatKey, StatePatch, UserGamificationState};

#[derive(Debug, Clone, PartialEq)]
pub struct XpGain {
    pub pending: PendingUpdate,
    pub leveled_up: bool,
}

/// +1 on the lifetime counter for `key`, sent as a delta.
pub fn increment_stat(state: &UserGamificationState, key: StatKey) -> EngineResult<PendingUpdate> {
    let mut tentative = state.clone();
    let counter = tentative.counter_mut(key);
    *counter = counter
        .checked_add(1)
        .ok_or(EngineError::CounterOverflow(key.column()))?;

    let mut patch = StatePatch::default();
    *patch.delta_mut(key) = 1;
    Ok(PendingUpdate::new(tentative, patch))
}

/// Add XP and recompute the level from the new total.
pub fn add_xp(state: &UserGamificationState, amount: u64) -> EngineResult<XpGain> {
    let total_xp = state
        .total_xp
        .checked_add(amount)
        .ok_or(EngineError::XpOverflow {
            total: state.total_xp,
            amount,
        })?;

    let old_level = level_from_total_xp(state.total_xp).level;
    let new_level = level_from_total_xp(total_xp).level;

    let mut tentative = state.clone();
    tentative.total_xp = total_xp;
    tentative.level = new_level;

    let patch = StatePatch {
        xp_delta: amount,
        ..Default::default()
    };

    Ok(XpGain {
        pending: PendingUpdate::new(tentative, patch),
        leveled_up: new_level > old_level,
    })
}
