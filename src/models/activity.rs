use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row per user per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingRecord {
    pub date: NaiveDate,
    pub minutes_logged: u32,
}

impl WalkingRecord {
    pub fn new(date: NaiveDate, minutes_logged: u32) -> Self {
        Self {
            date,
            minutes_logged,
        }
    }

    pub fn meets_goal(&self, daily_goal_minutes: u32) -> bool {
        self.minutes_logged >= daily_goal_minutes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub recorded_at: DateTime<Utc>,
    pub weight_value: f64,
}
