use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::AppConfig;
use crate::db::repository::{ActivityRepo, SqliteStore};
use crate::db::store::GamificationStore;
use crate::engine::treat::TreatProgress;
use crate::engine::trends::weight_trend;
use crate::engine::{ActivityOutcome, Clock, StateView, SystemClock, Tracker};
use crate::error::{EngineError, StoreError};
use crate::models::{StatKey, WalkingRecord, WeightRecord};
use crate::utils::format::{format_days, format_weight, progress_bar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

const TREND_WINDOW: usize = 7;

fn open_tracker<'a>(
    store: &'a SqliteStore<'a>,
    config: &AppConfig,
    user_id: &str,
) -> Result<Tracker<'a, SqliteStore<'a>, SystemClock>> {
    Tracker::open(store, &SystemClock, user_id, config.rewards.grant_achievement_xp)
        .with_context(|| format!("Loading state for '{}'", user_id))
}

// ─── Logging actions ─────────────────────────────────────────────────────────

/// A logged activity row together with what the tracker made of it.
struct Logged<T> {
    row: T,
    outcome: ActivityOutcome,
    /// Set when the achievement check was cut short after the activity landed.
    interrupted: Option<StoreError>,
}

/// An `Incomplete` error still recorded the activity, so it is reported like
/// a success; every other error means nothing was kept.
fn settle(
    result: Result<ActivityOutcome, EngineError>,
) -> Result<(ActivityOutcome, Option<StoreError>), EngineError> {
    match result {
        Ok(outcome) => Ok((outcome, None)),
        Err(EngineError::Incomplete { outcome, source }) => Ok((*outcome, Some(source))),
        Err(e) => Err(e),
    }
}

fn finish(interrupted: Option<StoreError>) -> Result<()> {
    match interrupted {
        None => Ok(()),
        Some(e) => Err(anyhow::Error::new(e)
            .context("Entry saved, but achievements were not fully checked; they will be on the next entry")),
    }
}

/// The walking row is written only after the tracker accepted the action,
/// so a failed attempt leaves no minutes behind to double up on retry.
fn record_walk<S: GamificationStore + ?Sized, C: Clock + ?Sized>(
    conn: &Connection,
    tracker: &mut Tracker<'_, S, C>,
    config: &AppConfig,
    user_id: &str,
    today: NaiveDate,
    minutes: u32,
) -> Result<Logged<WalkingRecord>> {
    let xp = config.rewards.xp_for(StatKey::Walking);
    let (outcome, interrupted) = settle(tracker.record_activity(StatKey::Walking, xp))?;
    let row = ActivityRepo::log_walking(conn, user_id, today, minutes)?;
    Ok(Logged {
        row,
        outcome,
        interrupted,
    })
}

fn record_weight<S: GamificationStore + ?Sized, C: Clock + ?Sized>(
    conn: &Connection,
    tracker: &mut Tracker<'_, S, C>,
    config: &AppConfig,
    user_id: &str,
    recorded_at: DateTime<Utc>,
    kg: f64,
) -> Result<Logged<WeightRecord>> {
    let xp = config.rewards.xp_for(StatKey::Weight);
    let (outcome, interrupted) = settle(tracker.record_activity(StatKey::Weight, xp))?;
    let row = ActivityRepo::log_weight(conn, user_id, recorded_at, kg)?;
    Ok(Logged {
        row,
        outcome,
        interrupted,
    })
}

pub fn handle_walk(conn: &Connection, config: &AppConfig, user_id: &str, minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(anyhow!("Minutes must be greater than zero"));
    }
    let store = SqliteStore::new(conn);
    let mut tracker = open_tracker(&store, config, user_id)?;
    let logged = record_walk(conn, &mut tracker, config, user_id, SystemClock.today(), minutes)?;

    let goal = config.goals.daily_walking_minutes;
    println_colored!(
        GREEN,
        "  ✓ Logged {} min — today's total: {}/{} min",
        minutes,
        logged.row.minutes_logged,
        goal
    );
    if logged.row.meets_goal(goal) {
        println_colored!(GREEN, "  ✓ Daily goal met");
    }
    print_outcome(&logged.outcome);
    finish(logged.interrupted)
}

pub fn handle_weight(conn: &Connection, config: &AppConfig, user_id: &str, kg: f64) -> Result<()> {
    if !kg.is_finite() || kg <= 0.0 {
        return Err(anyhow!("Weight must be a positive number, got {}", kg));
    }
    let store = SqliteStore::new(conn);
    let mut tracker = open_tracker(&store, config, user_id)?;
    let logged = record_weight(conn, &mut tracker, config, user_id, SystemClock.now(), kg)?;

    println_colored!(GREEN, "  ✓ Logged {}", format_weight(logged.row.weight_value));
    print_outcome(&logged.outcome);
    finish(logged.interrupted)
}

pub fn handle_challenge(
    conn: &Connection,
    config: &AppConfig,
    user_id: &str,
    xp: Option<u64>,
) -> Result<()> {
    let store = SqliteStore::new(conn);
    let mut tracker = open_tracker(&store, config, user_id)?;
    let xp = xp.unwrap_or_else(|| config.rewards.xp_for(StatKey::Challenge));
    let (outcome, interrupted) = settle(tracker.record_activity(StatKey::Challenge, xp))?;

    println_colored!(GREEN, "  ✓ Challenge completed");
    print_outcome(&outcome);
    finish(interrupted)
}

fn print_outcome(outcome: &ActivityOutcome) {
    let state = &outcome.state;
    println_colored!(
        AMBER,
        "  +{} XP  ·  streak {}",
        outcome.xp_awarded,
        format_days(state.current_streak)
    );
    if outcome.leveled_up {
        println_colored!(
            GOLD,
            "  ★ Level up! You are now level {} (+{})",
            state.level,
            outcome.levels_gained
        );
    }
    for achievement in &outcome.new_achievements {
        println_colored!(
            GOLD,
            "  🏆 Achievement unlocked: {} — {} ({}, +{} XP)",
            achievement.name,
            achievement.description,
            achievement.rarity.as_str(),
            achievement.xp_reward
        );
    }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    view: StateView,
    treat: TreatProgress,
    latest_weight: Option<f64>,
    weight_average: Option<f64>,
}

pub fn handle_status(conn: &Connection, config: &AppConfig, user_id: &str, json: bool) -> Result<()> {
    let store = SqliteStore::new(conn);
    let mut tracker = open_tracker(&store, config, user_id)?;
    let view = tracker.view();
    let treat = tracker.treat_progress(config.goals.daily_walking_minutes, config.treat.goal_days)?;
    let weights = ActivityRepo::recent_weights(conn, user_id, TREND_WINDOW)?;
    let trend = weight_trend(&weights, TREND_WINDOW);

    let report = StatusReport {
        view,
        treat,
        latest_weight: trend.map(|(latest, _)| latest),
        weight_average: trend.map(|(_, avg)| avg),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = &report.view.state;
    let level = &report.view.level;
    println!();
    println_colored!(GOLD, "  Stride — {}", user_id);
    println!();
    println_colored!(
        BOLD,
        "  Level {}      {}  {}/{} XP",
        level.level,
        progress_bar(level.progress_percent, 12),
        level.current_level_xp,
        level.next_level_xp
    );
    println!("  Total XP:    {}", state.total_xp);
    println_colored!(
        GREEN,
        "  Streak:      {} current  |  {} best",
        format_days(state.current_streak),
        format_days(state.longest_streak)
    );
    println!(
        "  Logged:      {} walks  ·  {} weigh-ins  ·  {} challenges",
        state.total_walking_entries, state.total_weight_entries, state.total_challenges_completed
    );
    if let (Some(latest), Some(avg)) = (report.latest_weight, report.weight_average) {
        println!(
            "  Weight:      {} ({}-entry avg {})",
            format_weight(latest),
            TREND_WINDOW,
            format_weight(avg)
        );
    }
    print_treat(&report.treat);
    println!();
    Ok(())
}

fn print_treat(treat: &TreatProgress) {
    println!(
        "  Treat:       {}  {}/{} goal days",
        progress_bar(treat.progress_percent, 12),
        treat.goal_days.count,
        treat.threshold
    );
    if !treat.goal_days.today_goal_met {
        println_colored!(DIM, "               today's goal not met yet");
    }
    if treat.available {
        println_colored!(GOLD, "  🎁 A treat is waiting — run `stride treat --claim`");
    }
}

// ─── Achievements ────────────────────────────────────────────────────────────

pub fn handle_achievements(conn: &Connection, config: &AppConfig, user_id: &str) -> Result<()> {
    let store = SqliteStore::new(conn);
    let tracker = open_tracker(&store, config, user_id)?;
    let board = tracker.achievement_board()?;
    let earned = board.iter().filter(|e| e.unlocked.is_some()).count();

    println!();
    println_colored!(GOLD, "  Achievements ({}/{})", earned, board.len());
    println!();
    for entry in &board {
        let a = &entry.achievement;
        match &entry.unlocked {
            Some(u) => println_colored!(
                GREEN,
                "  ✓ {:<18} {:<32} {}",
                a.name,
                a.description,
                u.unlocked_at.format("%Y-%m-%d")
            ),
            None => println_colored!(
                DIM,
                "  ○ {:<18} {:<32} {} · +{} XP",
                a.name,
                a.description,
                a.rarity.as_str(),
                a.xp_reward
            ),
        }
    }
    println!();
    Ok(())
}

// ─── Treat ───────────────────────────────────────────────────────────────────

pub fn handle_treat(conn: &Connection, config: &AppConfig, user_id: &str, claim: bool) -> Result<()> {
    let store = SqliteStore::new(conn);
    let mut tracker = open_tracker(&store, config, user_id)?;
    let goal = config.goals.daily_walking_minutes;
    let threshold = config.treat.goal_days;

    if !claim {
        println!();
        print_treat(&tracker.treat_progress(goal, threshold)?);
        println!();
        return Ok(());
    }

    match tracker.claim_treat(goal, threshold) {
        Ok(state) => {
            println_colored!(GOLD, "  🎁 Treat claimed! ({} so far)", state.treats_claimed);
            Ok(())
        }
        Err(EngineError::TreatUnavailable { progress, threshold }) => {
            println_colored!(
                AMBER,
                "  No treat yet — {}/{} goal days",
                progress,
                threshold
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
