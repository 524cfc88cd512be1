//! Actor - self-play game generator
//!
//! A long-running process that:
//! 1. Plays games against itself with batched MCTS on a pool of workers
//! 2. Short-circuits proven forced wins with a bounded mate solver
//! 3. Appends one JSON game record per line to `<data_dir>/selfplay.jsonl`
//! 4. Keeps a stats snapshot in `<data_dir>/actor_stats.json`

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod actor;
mod config;
mod record;
mod selfplay;
mod stats;

use crate::actor::Actor;
use crate::config::Config;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let max_games_description = if config.max_games < 0 {
        "unlimited".to_string()
    } else {
        config.max_games.to_string()
    };
    info!(
        max_games = config.max_games,
        "Actor {} will play {} games of {}", config.actor_id, max_games_description, config.env_id
    );

    let actor = Arc::new(Actor::new(config)?);

    // Ctrl-C stops every worker at its next search round
    let shutdown_actor = Arc::clone(&actor);
    let shutdown_handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping actor...");
                shutdown_actor.shutdown();
            }
            Err(e) => warn!("Failed to listen for ctrl+c: {}", e),
        }
    });

    let run_result = Arc::clone(&actor).run().await;
    shutdown_handle.abort();

    match run_result {
        Ok(()) => {
            info!("Actor completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {}", e);
            Err(e)
        }
    }
}
