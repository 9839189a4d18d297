use chrono::NaiveDate;

use crate::engine::pending::PendingUpdate;
use crate::models::{StatePatch, StreakPatch, UserGamificationState};

/// Days from `last` to `today`. Negative when the stored date is ahead of
/// the clock.
fn days_since(last: NaiveDate, today: NaiveDate) -> i64 {
    (today - last).num_days()
}

/// The streak as it should be displayed: the stored counter if the last
/// activity was today or yesterday, otherwise 0.
///
/// A last-activity date ahead of `today` (clock moved backwards) keeps the
/// stored value.
pub fn validate_streak(stored: u32, last_activity: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_activity {
        None => 0,
        Some(last) if days_since(last, today) <= 1 => stored,
        Some(_) => 0,
    }
}

/// Corrective write for a lapsed streak, if the stored counter is stale.
pub fn correct_streak(state: &UserGamificationState, today: NaiveDate) -> Option<PendingUpdate> {
    let validated = validate_streak(state.current_streak, state.last_activity_date, today);
    if validated == state.current_streak {
        return None;
    }

    let mut tentative = state.clone();
    tentative.current_streak = validated;
    let patch = StatePatch {
        streak: Some(StreakPatch {
            current: validated,
            longest: state.longest_streak,
            last_activity_date: state.last_activity_date,
        }),
        ..Default::default()
    };
    Some(PendingUpdate::new(tentative, patch))
}

/// Count a qualifying activity on `today`.
///
/// Same day: nothing changes. Yesterday: the streak grows by one. Anything
/// older, or no previous activity: the streak restarts at 1.
pub fn update_streak(state: &UserGamificationState, today: NaiveDate) -> PendingUpdate {
    let current = match state.last_activity_date {
        Some(last) if days_since(last, today) <= 0 => return PendingUpdate::unchanged(state),
        Some(last) if days_since(last, today) == 1 => state.current_streak.saturating_add(1),
        _ => 1,
    };
    let longest = state.longest_streak.max(current);

    let mut tentative = state.clone();
    tentative.current_streak = current;
    tentative.longest_streak = longest;
    tentative.last_activity_date = Some(today);

    let patch = StatePatch {
        streak: Some(StreakPatch {
            current,
            longest,
            last_activity_date: Some(today),
        }),
        ..Default::default()
    };
    PendingUpdate::new(tentative, patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn state_with(current: u32, longest: u32, last: Option<NaiveDate>) -> UserGamificationState {
        let mut state = UserGamificationState::new("u1");
        state.current_streak = current;
        state.longest_streak = longest;
        state.last_activity_date = last;
        state
    }

    #[test]
    fn test_validate_keeps_today_and_yesterday() {
        let t = today();
        assert_eq!(validate_streak(5, Some(t), t), 5);
        assert_eq!(validate_streak(5, Some(t - Duration::days(1)), t), 5);
    }

    #[test]
    fn test_validate_lapsed_streak() {
        let t = today();
        assert_eq!(validate_streak(5, Some(t - Duration::days(2)), t), 0);
        assert_eq!(validate_streak(5, Some(t - Duration::days(40)), t), 0);
        assert_eq!(validate_streak(3, None, t), 0);
    }

    #[test]
    fn test_validate_across_month_boundary() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let feb_29 = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(validate_streak(9, Some(feb_29), t), 9);
    }

    #[test]
    fn test_correct_streak_only_when_stale() {
        let t = today();
        assert!(correct_streak(&state_with(4, 4, Some(t)), t).is_none());

        let stale = state_with(4, 6, Some(t - Duration::days(3)));
        let pending = correct_streak(&stale, t).unwrap();
        assert_eq!(pending.tentative.current_streak, 0);
        assert_eq!(pending.tentative.longest_streak, 6);
        let streak = pending.patch.streak.unwrap();
        assert_eq!(streak.current, 0);
        assert_eq!(streak.longest, 6);
        assert_eq!(pending.patch.xp_delta, 0);
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let t = today();
        let pending = update_streak(&state_with(0, 0, None), t);
        assert_eq!(pending.tentative.current_streak, 1);
        assert_eq!(pending.tentative.longest_streak, 1);
        assert_eq!(pending.tentative.last_activity_date, Some(t));
    }

    #[test]
    fn test_consecutive_day_extends() {
        let t = today();
        let pending = update_streak(&state_with(3, 3, Some(t - Duration::days(1))), t);
        assert_eq!(pending.tentative.current_streak, 4);
        assert_eq!(pending.tentative.longest_streak, 4);
    }

    #[test]
    fn test_gap_restarts() {
        let t = today();
        let pending = update_streak(&state_with(8, 10, Some(t - Duration::days(2))), t);
        assert_eq!(pending.tentative.current_streak, 1);
        assert_eq!(pending.tentative.longest_streak, 10);
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let t = today();
        let first = update_streak(&state_with(2, 2, Some(t - Duration::days(1))), t);
        assert_eq!(first.tentative.current_streak, 3);

        let second = update_streak(&first.tentative, t);
        assert!(second.is_noop());
        assert_eq!(second.tentative.current_streak, 3);
    }

    #[test]
    fn test_future_last_date_is_left_alone() {
        let t = today();
        let pending = update_streak(&state_with(2, 2, Some(t + Duration::days(1))), t);
        assert!(pending.is_noop());
    }

    #[test]
    fn test_longest_never_decreases() {
        let start = today();
        let mut state = state_with(0, 0, None);
        let mut longest = 0;
        // days 0-4 consecutive, skip 5-6, then 7-8
        for offset in [0, 1, 2, 3, 4, 7, 8, 8, 12] {
            let pending = update_streak(&state, start + Duration::days(offset));
            state = pending.tentative;
            assert!(state.longest_streak >= longest);
            assert!(state.longest_streak >= state.current_streak);
            longest = state.longest_streak;
        }
        assert_eq!(state.longest_streak, 5);
        assert_eq!(state.current_streak, 1);
    }
}
