use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS gamification_state (
            user_id                     TEXT PRIMARY KEY,
            total_xp                    INTEGER NOT NULL DEFAULT 0 CHECK(total_xp >= 0),
            level                       INTEGER NOT NULL DEFAULT 1 CHECK(level >= 1),
            current_streak              INTEGER NOT NULL DEFAULT 0 CHECK(current_streak >= 0),
            longest_streak              INTEGER NOT NULL DEFAULT 0 CHECK(longest_streak >= 0),
            last_activity_date          TEXT,
            total_walking_entries       INTEGER NOT NULL DEFAULT 0 CHECK(total_walking_entries >= 0),
            total_weight_entries        INTEGER NOT NULL DEFAULT 0 CHECK(total_weight_entries >= 0),
            total_challenges_completed  INTEGER NOT NULL DEFAULT 0 CHECK(total_challenges_completed >= 0),
            treats_claimed              INTEGER NOT NULL DEFAULT 0 CHECK(treats_claimed >= 0),
            last_treat_claimed_on       TEXT,
            updated_at                  TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS achievements (
            id                 TEXT PRIMARY KEY,
            name               TEXT NOT NULL,
            description        TEXT NOT NULL DEFAULT '',
            requirement_type   TEXT NOT NULL CHECK(requirement_type IN (
                                   'streak_days','goal_reached','weight_logged','challenges_completed',
                                   'first_steps','first_weight','first_challenge','level')),
            requirement_value  INTEGER NOT NULL DEFAULT 1,
            xp_reward          INTEGER NOT NULL DEFAULT 0 CHECK(xp_reward >= 0),
            rarity             TEXT NOT NULL CHECK(rarity IN ('common','rare','epic','legendary')),
            category           TEXT NOT NULL,
            sort_order         INTEGER DEFAULT 0,
            active             INTEGER DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS unlocked_achievements (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL,
            achievement_id  TEXT NOT NULL REFERENCES achievements(id),
            unlocked_at     TEXT NOT NULL,
            UNIQUE(user_id, achievement_id)
        );

        CREATE TABLE IF NOT EXISTS walking_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL,
            date            TEXT NOT NULL,
            minutes_logged  INTEGER NOT NULL DEFAULT 0 CHECK(minutes_logged >= 0),
            UNIQUE(user_id, date)
        );

        CREATE TABLE IF NOT EXISTS weight_records (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       TEXT NOT NULL,
            recorded_at   TEXT NOT NULL,
            weight_value  REAL NOT NULL CHECK(weight_value > 0)
        );

        CREATE INDEX IF NOT EXISTS idx_weight_user_time ON weight_records(user_id, recorded_at);
    ")?;

    seed_catalog(conn)?;
    Ok(())
}

fn seed_catalog(conn: &Connection) -> Result<()> {
    let catalog = [
        ("first_steps", "First Steps", "Log your first walk", "first_steps", 1, 10, "common", "walking", 0),
        ("walks_10", "Regular Walker", "Log 10 walks", "goal_reached", 10, 50, "common", "walking", 1),
        ("walks_50", "Trailblazer", "Log 50 walks", "goal_reached", 50, 150, "rare", "walking", 2),
        ("walks_100", "Centurion", "Log 100 walks", "goal_reached", 100, 300, "epic", "walking", 3),
        ("first_weight", "On The Scale", "Log your first weight", "first_weight", 1, 10, "common", "weight", 10),
        ("weight_10", "Steady Tracker", "Log your weight 10 times", "weight_logged", 10, 50, "rare", "weight", 11),
        ("weight_30", "Data Driven", "Log your weight 30 times", "weight_logged", 30, 150, "epic", "weight", 12),
        ("streak_3", "Warming Up", "Stay active 3 days in a row", "streak_days", 3, 25, "common", "streak", 20),
        ("streak_7", "Week Warrior", "Stay active 7 days in a row", "streak_days", 7, 75, "rare", "streak", 21),
        ("streak_30", "Unstoppable", "Stay active 30 days in a row", "streak_days", 30, 300, "legendary", "streak", 22),
        ("first_challenge", "Challenger", "Complete your first challenge", "first_challenge", 1, 25, "common", "challenges", 30),
        ("challenges_10", "Challenge Seeker", "Complete 10 challenges", "challenges_completed", 10, 150, "epic", "challenges", 31),
        ("level_5", "Rising Star", "Reach level 5", "level", 5, 100, "rare", "level", 40),
        ("level_10", "Veteran", "Reach level 10", "level", 10, 250, "legendary", "level", 41),
    ];

    for (id, name, description, requirement_type, value, xp, rarity, category, order) in &catalog {
        conn.execute(
            "INSERT OR IGNORE INTO achievements
                (id, name, description, requirement_type, requirement_value, xp_reward,
                 rarity, category, sort_order, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
            rusqlite::params![id, name, description, requirement_type, value, xp, rarity, category, order],
        )?;
    }
    Ok(())
}
