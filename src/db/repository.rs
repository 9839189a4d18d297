use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

use crate::db::store::GamificationStore;
use crate::engine::level::level_from_total_xp;
use crate::error::StoreError;
use crate::models::{
    Achievement, InsertOutcome, Rarity, RequirementType, StatePatch, UnlockedAchievement,
    UserGamificationState, WalkingRecord, WeightRecord,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Conversions ────────────────────────────────────────────────────────────

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("bad date '{}': {}", s, e)))
}

fn parse_optional_date(s: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    s.as_deref().map(parse_date).transpose()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", s, e)))
}

fn to_u64(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {}: {}", column, value)))
}

fn to_u32(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("out of range {}: {}", column, value)))
}

fn to_sql_int(value: u64, column: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} too large: {}", column, value)))
}

// ─── Gamification store ─────────────────────────────────────────────────────

/// SQLite-backed `GamificationStore`.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn ensure_row(&self, user_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO gamification_state (user_id) VALUES (?1)",
            params![user_id],
        )?;
        Ok(())
    }

    fn read_state(&self, user_id: &str) -> Result<Option<UserGamificationState>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT total_xp, level, current_streak, longest_streak, last_activity_date,
                        total_walking_entries, total_weight_entries, total_challenges_completed,
                        treats_claimed, last_treat_claimed_on
                 FROM gamification_state WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                        row.get::<_, i64>(8)?,
                        row.get::<_, Option<String>>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            total_xp,
            level,
            current_streak,
            longest_streak,
            last_activity_date,
            walking,
            weight,
            challenges,
            treats_claimed,
            last_treat_claimed_on,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(UserGamificationState {
            user_id: user_id.to_string(),
            total_xp: to_u64(total_xp, "total_xp")?,
            level: to_u32(level, "level")?,
            current_streak: to_u32(current_streak, "current_streak")?,
            longest_streak: to_u32(longest_streak, "longest_streak")?,
            last_activity_date: parse_optional_date(last_activity_date)?,
            total_walking_entries: to_u64(walking, "total_walking_entries")?,
            total_weight_entries: to_u64(weight, "total_weight_entries")?,
            total_challenges_completed: to_u64(challenges, "total_challenges_completed")?,
            treats_claimed: to_u32(treats_claimed, "treats_claimed")?,
            last_treat_claimed_on: parse_optional_date(last_treat_claimed_on)?,
        }))
    }

    fn read_existing(&self, user_id: &str) -> Result<UserGamificationState, StoreError> {
        self.read_state(user_id)?
            .ok_or_else(|| StoreError::Corrupt(format!("state row vanished for {}", user_id)))
    }

    /// Apply `patch` to the row and recompute the level. Callers own the
    /// surrounding transaction.
    fn merge_patch(
        &self,
        user_id: &str,
        patch: &StatePatch,
    ) -> Result<UserGamificationState, StoreError> {
        self.ensure_row(user_id)?;

        self.conn.execute(
            "UPDATE gamification_state SET
                total_xp = total_xp + ?2,
                total_walking_entries = total_walking_entries + ?3,
                total_weight_entries = total_weight_entries + ?4,
                total_challenges_completed = total_challenges_completed + ?5,
                treats_claimed = treats_claimed + ?6,
                updated_at = datetime('now')
             WHERE user_id = ?1",
            params![
                user_id,
                to_sql_int(patch.xp_delta, "xp_delta")?,
                to_sql_int(patch.walking_delta, "walking_delta")?,
                to_sql_int(patch.weight_delta, "weight_delta")?,
                to_sql_int(patch.challenge_delta, "challenge_delta")?,
                patch.treats_delta,
            ],
        )?;

        if let Some(streak) = &patch.streak {
            self.conn.execute(
                "UPDATE gamification_state SET
                    current_streak = ?2,
                    longest_streak = MAX(longest_streak, ?3),
                    last_activity_date = ?4
                 WHERE user_id = ?1",
                params![
                    user_id,
                    streak.current,
                    streak.longest,
                    streak.last_activity_date.map(format_date),
                ],
            )?;
        }

        if let Some(claimed_on) = patch.last_treat_claimed_on {
            self.conn.execute(
                "UPDATE gamification_state SET last_treat_claimed_on = ?2 WHERE user_id = ?1",
                params![user_id, format_date(claimed_on)],
            )?;
        }

        let mut state = self.read_existing(user_id)?;
        let level = level_from_total_xp(state.total_xp).level;
        if level != state.level {
            self.conn.execute(
                "UPDATE gamification_state SET level = ?2 WHERE user_id = ?1",
                params![user_id, level],
            )?;
            state.level = level;
        }
        Ok(state)
    }
}

impl GamificationStore for SqliteStore<'_> {
    fn load_state(&self, user_id: &str) -> Result<UserGamificationState, StoreError> {
        if let Some(state) = self.read_state(user_id)? {
            return Ok(state);
        }
        debug!("creating gamification state for {}", user_id);
        self.ensure_row(user_id)?;
        self.read_existing(user_id)
    }

    fn save_state(
        &self,
        user_id: &str,
        patch: &StatePatch,
    ) -> Result<UserGamificationState, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let state = self.merge_patch(user_id, patch)?;
        tx.commit()?;
        Ok(state)
    }

    fn load_catalog(&self) -> Result<Vec<Achievement>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, requirement_type, requirement_value, xp_reward,
                    rarity, category
             FROM achievements WHERE active = 1 ORDER BY sort_order, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (id, name, description, requirement_type, value, xp_reward, rarity, category) = r?;
            result.push(Achievement {
                requirement_type: RequirementType::from_str(&requirement_type)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                requirement_value: to_u64(value, "requirement_value")?,
                xp_reward: to_u64(xp_reward, "xp_reward")?,
                rarity: Rarity::from_str(&rarity).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                id,
                name,
                description,
                category,
            });
        }
        Ok(result)
    }

    fn load_unlocked(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT achievement_id, unlocked_at FROM unlocked_achievements
             WHERE user_id = ?1 ORDER BY unlocked_at, id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (achievement_id, unlocked_at) = r?;
            result.push(UnlockedAchievement {
                achievement_id,
                unlocked_at: parse_timestamp(&unlocked_at)?,
            });
        }
        Ok(result)
    }

    fn insert_unlocked(
        &self,
        user_id: &str,
        achievement_id: &str,
        xp_reward: u64,
    ) -> Result<InsertOutcome, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO unlocked_achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, achievement_id, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Ok(InsertOutcome::AlreadyExists);
        }
        if xp_reward > 0 {
            let reward = StatePatch {
                xp_delta: xp_reward,
                ..Default::default()
            };
            self.merge_patch(user_id, &reward)?;
        }
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    fn load_walking_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<WalkingRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, minutes_logged FROM walking_records
             WHERE user_id = ?1 AND date >= ?2 ORDER BY date",
        )?;

        let rows = stmt.query_map(params![user_id, format_date(since)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (date, minutes) = r?;
            result.push(WalkingRecord::new(
                parse_date(&date)?,
                to_u32(minutes, "minutes_logged")?,
            ));
        }
        Ok(result)
    }
}

// ─── Activity repo ──────────────────────────────────────────────────────────

/// Raw walking and weight rows. The engine only reads these; the CLI writes
/// them once the tracker has accepted the action.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Add minutes to the day's walking row, creating it if needed.
    pub fn log_walking(
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<WalkingRecord, StoreError> {
        let date_str = format_date(date);
        conn.execute(
            "INSERT INTO walking_records (user_id, date, minutes_logged) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, date) DO UPDATE SET minutes_logged = minutes_logged + ?3",
            params![user_id, date_str, minutes],
        )?;

        let total: i64 = conn.query_row(
            "SELECT minutes_logged FROM walking_records WHERE user_id = ?1 AND date = ?2",
            params![user_id, date_str],
            |row| row.get(0),
        )?;
        Ok(WalkingRecord::new(date, to_u32(total, "minutes_logged")?))
    }

    pub fn log_weight(
        conn: &Connection,
        user_id: &str,
        recorded_at: DateTime<Utc>,
        weight_value: f64,
    ) -> Result<WeightRecord, StoreError> {
        conn.execute(
            "INSERT INTO weight_records (user_id, recorded_at, weight_value) VALUES (?1, ?2, ?3)",
            params![user_id, recorded_at.to_rfc3339(), weight_value],
        )?;
        Ok(WeightRecord {
            recorded_at,
            weight_value,
        })
    }

    /// Most recent `limit` weight entries, oldest first.
    pub fn recent_weights(
        conn: &Connection,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<WeightRecord>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT recorded_at, weight_value FROM weight_records
             WHERE user_id = ?1 ORDER BY recorded_at DESC, id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (recorded_at, weight_value) = r?;
            result.push(WeightRecord {
                recorded_at: parse_timestamp(&recorded_at)?,
                weight_value,
            });
        }
        result.reverse();
        Ok(result)
    }
}
