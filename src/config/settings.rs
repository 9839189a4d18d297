use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::goal_days::MAX_SCAN_DAYS;
use crate::models::StatKey;

fn default_user_id() -> String {
    "local".to_string()
}
fn default_daily_walking_minutes() -> u32 {
    30
}
fn default_walking_xp() -> u64 {
    10
}
fn default_weight_xp() -> u64 {
    5
}
fn default_challenge_xp() -> u64 {
    50
}
fn default_goal_days() -> u32 {
    14
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default = "default_daily_walking_minutes")]
    pub daily_walking_minutes: u32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            daily_walking_minutes: default_daily_walking_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_walking_xp")]
    pub walking_xp: u64,
    #[serde(default = "default_weight_xp")]
    pub weight_xp: u64,
    #[serde(default = "default_challenge_xp")]
    pub challenge_xp: u64,
    /// Unlocking an achievement also adds its XP reward.
    #[serde(default = "default_true")]
    pub grant_achievement_xp: bool,
}

impl RewardConfig {
    pub fn xp_for(&self, key: StatKey) -> u64 {
        match key {
            StatKey::Walking => self.walking_xp,
            StatKey::Weight => self.weight_xp,
            StatKey::Challenge => self.challenge_xp,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            walking_xp: default_walking_xp(),
            weight_xp: default_weight_xp(),
            challenge_xp: default_challenge_xp(),
            grant_achievement_xp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatConfig {
    /// Consecutive goal days needed for one treat. The goal-day scan looks
    /// back at most `MAX_SCAN_DAYS`, so larger values are rejected.
    #[serde(default = "default_goal_days")]
    pub goal_days: u32,
}

impl Default for TreatConfig {
    fn default() -> Self {
        Self {
            goal_days: default_goal_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub goals: GoalConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub treat: TreatConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "stride")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("stride.db"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Parsing config.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let goal_days = self.treat.goal_days;
        if goal_days == 0 || goal_days > MAX_SCAN_DAYS {
            bail!(
                "treat.goal_days must be between 1 and {}, got {}",
                MAX_SCAN_DAYS,
                goal_days
            );
        }
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
