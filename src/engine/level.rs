use serde::Serialize;

const BASE_LEVEL_XP: u128 = 100;
const LEVEL_GROWTH: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    /// XP earned inside the current level.
    pub current_level_xp: u64,
    /// Step size of the current level.
    pub next_level_xp: u64,
    /// 0.0..100.0
    pub progress_percent: f64,
}

/// XP needed to clear `level`: floor(100 * 1.5^(level-1)), computed as
/// (100 * 3^n) >> n. Exact while that numerator fits a u128, which covers
/// every level up to 77. Higher levels fall back to the f64 curve and
/// saturate at `u64::MAX`.
pub fn xp_required_for_level(level: u32) -> u64 {
    let exponent = level.max(1) - 1;
    let exact = 3u128
        .checked_pow(exponent)
        .and_then(|p| p.checked_mul(BASE_LEVEL_XP))
        .map(|n| n >> exponent);

    match exact {
        Some(xp) => u64::try_from(xp).unwrap_or(u64::MAX),
        None => (BASE_LEVEL_XP as f64 * LEVEL_GROWTH.powi(exponent as i32)).floor() as u64,
    }
}

/// Walk the curve from level 1, spending XP on each full level.
pub fn level_from_total_xp(total_xp: u64) -> LevelInfo {
    let mut level = 1u32;
    let mut remaining = total_xp;
    let mut required = xp_required_for_level(level);

    while remaining >= required {
        remaining -= required;
        level += 1;
        required = xp_required_for_level(level);
    }

    LevelInfo {
        level,
        current_level_xp: remaining,
        next_level_xp: required,
        progress_percent: 100.0 * remaining as f64 / required as f64,
    }
}
