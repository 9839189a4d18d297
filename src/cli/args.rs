use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stride", version, author, about = "A terminal walking and weight log with XP, levels and streaks")]
pub struct Cli {
    /// Profile to track (overrides profile.user_id from config.toml)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log walking minutes for today
    Walk {
        /// Minutes walked
        minutes: u32,
    },
    /// Log a body weight entry
    Weight {
        /// Weight in kilograms
        kg: f64,
    },
    /// Mark a challenge as completed
    Challenge {
        /// XP to award instead of rewards.challenge_xp
        #[arg(long)]
        xp: Option<u64>,
    },
    /// Show level, streak, counters and treat progress
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all achievements
    Achievements,
    /// Show treat progress, or claim an earned treat
    Treat {
        /// Claim the treat if it is available
        #[arg(long)]
        claim: bool,
    },
}
