use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    StreakDays,
    GoalReached,
    WeightLogged,
    ChallengesCompleted,
    FirstSteps,
    FirstWeight,
    FirstChallenge,
    Level,
}

impl FromStr for RequirementType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "streak_days" => Ok(RequirementType::StreakDays),
            "goal_reached" => Ok(RequirementType::GoalReached),
            "weight_logged" => Ok(RequirementType::WeightLogged),
            "challenges_completed" => Ok(RequirementType::ChallengesCompleted),
            "first_steps" => Ok(RequirementType::FirstSteps),
            "first_weight" => Ok(RequirementType::FirstWeight),
            "first_challenge" => Ok(RequirementType::FirstChallenge),
            "level" => Ok(RequirementType::Level),
            _ => Err(anyhow::anyhow!("Unknown requirement type: {}", s)),
        }
    }
}

/// Display-only ordering; rarity never affects unlocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            _ => Err(anyhow::anyhow!("Unknown rarity: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirement_type: RequirementType,
    pub requirement_value: u64,
    pub xp_reward: u64,
    pub rarity: Rarity,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Result of inserting an unlock row; a uniqueness hit is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}
