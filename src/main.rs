mod cli;
mod config;
mod db;
mod engine;
mod error;
mod models;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::migrations::run_migrations;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;
    let user_id = cli.user.clone().unwrap_or_else(|| config.profile.user_id.clone());

    // Ensure data directory exists and open DB
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    // Run migrations on every startup
    run_migrations(&conn)?;
    log::debug!("database ready at {:?}, user '{}'", db_path, user_id);

    match cli.command {
        Some(Commands::Walk { minutes }) => {
            handlers::handle_walk(&conn, &config, &user_id, minutes)?;
        }
        Some(Commands::Weight { kg }) => {
            handlers::handle_weight(&conn, &config, &user_id, kg)?;
        }
        Some(Commands::Challenge { xp }) => {
            handlers::handle_challenge(&conn, &config, &user_id, xp)?;
        }
        Some(Commands::Status { json }) => {
            handlers::handle_status(&conn, &config, &user_id, json)?;
        }
        Some(Commands::Achievements) => {
            handlers::handle_achievements(&conn, &config, &user_id)?;
        }
        Some(Commands::Treat { claim }) => {
            handlers::handle_treat(&conn, &config, &user_id, claim)?;
        }

        // No subcommand → status overview
        None => {
            handlers::handle_status(&conn, &config, &user_id, false)?;
        }
    }

    Ok(())
}
