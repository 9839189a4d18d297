use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::WalkingRecord;

/// Longest backward scan, in days.
pub const MAX_SCAN_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalDays {
    pub count: u32,
    pub today_goal_met: bool,
}

/// Count consecutive days meeting `daily_goal_minutes`, walking back from
/// today. An unfinished today does not break the run: the scan then starts
/// at yesterday.
pub fn consecutive_goal_days(
    records: &[WalkingRecord],
    daily_goal_minutes: u32,
    today: NaiveDate,
) -> GoalDays {
    let mut minutes_by_day: HashMap<NaiveDate, u32> = HashMap::new();
    for record in records {
        let entry = minutes_by_day.entry(record.date).or_insert(0);
        *entry = (*entry).max(record.minutes_logged);
    }
    let met = |day: NaiveDate| {
        minutes_by_day
            .get(&day)
            .is_some_and(|minutes| *minutes >= daily_goal_minutes)
    };

    let today_goal_met = met(today);
    let mut day = if today_goal_met {
        today
    } else {
        today - Duration::days(1)
    };

    let mut count = 0u32;
    while count < MAX_SCAN_DAYS && met(day) {
        count += 1;
        day = day - Duration::days(1);
    }

    GoalDays {
        count,
        today_goal_met,
    }
}
