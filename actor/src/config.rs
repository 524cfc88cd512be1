//! Configuration for the self-play actor
//!
//! Defaults come from the central config (config.toml plus `MINIZERO_*`
//! environment overrides). CLI arguments take highest priority.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use engine_config::{load_config, CentralConfig};
use mcts::MctsConfig;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use crate::selfplay::{PlayoutCap, SelfPlayConfig};

/// Games the actor knows how to play.
pub const SUPPORTED_ENVS: &[&str] = &["tictactoe"];

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn central() -> &'static CentralConfig {
    &CENTRAL_CONFIG
}

#[derive(Parser, Debug, Clone)]
#[command(name = "actor")]
#[command(about = "Self-play game generator driving the batched MCTS engine")]
#[command(
    long_about = "Plays self-play games with MCTS and appends one JSON game record per
line to the records file for training.

Configuration is loaded from config.toml with MINIZERO_* environment variable
overrides. CLI arguments take highest priority."
)]
pub struct Config {
    /// Unique actor identifier
    #[arg(long, default_value_t = central().actor.actor_id.clone())]
    pub actor_id: String,

    /// Game to play (e.g., tictactoe)
    #[arg(long, default_value_t = central().common.env_id.clone())]
    pub env_id: String,

    /// Directory for game records and stats
    #[arg(long, default_value_t = central().common.data_dir.clone())]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = central().common.log_level.clone())]
    pub log_level: String,

    /// Games played concurrently, each with its own search tree
    #[arg(long, default_value_t = central().actor.num_workers)]
    pub num_workers: usize,

    /// Games to play (-1 for unlimited)
    #[arg(long, default_value_t = central().actor.max_games, allow_negative_numbers = true)]
    pub max_games: i64,

    /// Log progress every N games (0 to disable)
    #[arg(long, default_value_t = central().actor.log_interval)]
    pub log_interval: u32,

    /// RNG seed; 0 seeds every worker from the OS
    #[arg(long, default_value_t = central().actor.seed)]
    pub seed: u64,

    /// Game records file, relative to data_dir
    #[arg(long, default_value_t = central().actor.records_file.clone())]
    pub records_file: String,

    /// Stats snapshot file, relative to data_dir
    #[arg(long, default_value_t = central().actor.stats_file.clone())]
    pub stats_file: String,

    /// MCTS simulations per move
    #[arg(long, default_value_t = central().mcts.simulation_num)]
    pub simulation_num: u32,

    /// Leaves evaluated per evaluator call
    #[arg(long, default_value_t = central().mcts.batch_size)]
    pub batch_size: u32,

    #[arg(long, default_value_t = central().mcts.c_base)]
    pub c_base: f64,

    #[arg(long, default_value_t = central().mcts.c_init)]
    pub c_init: f64,

    #[arg(long, default_value_t = central().mcts.dirichlet_alpha)]
    pub dirichlet_alpha: f64,

    #[arg(long, default_value_t = central().mcts.dirichlet_frac)]
    pub dirichlet_frac: f64,

    #[arg(long, default_value_t = central().mcts.forced_playout_k)]
    pub forced_playout_k: f64,

    /// Stop searching once this fraction of the node budget is used
    #[arg(long, default_value_t = central().mcts.memory_threshold)]
    pub memory_threshold: f64,

    /// Node budget of each worker's search tree
    #[arg(long, default_value_t = central().mcts.node_capacity)]
    pub node_capacity: usize,

    /// Per-search time limit in milliseconds (0 to disable)
    #[arg(long, default_value_t = central().mcts.time_limit_ms)]
    pub time_limit_ms: u64,

    /// Log an info line while searching
    #[arg(long, default_value_t = central().mcts.verbose, action = ArgAction::Set)]
    pub verbose: bool,

    /// Maximum plies per game; longer games are drawn
    #[arg(long, default_value_t = central().selfplay.max_moves)]
    pub max_moves: u32,

    /// Plies played by sampling visit counts before switching to greedy
    #[arg(long, default_value_t = central().selfplay.num_sampling_moves)]
    pub num_sampling_moves: u32,

    #[arg(long, default_value_t = central().selfplay.temperature)]
    pub temperature: f64,

    /// Alternate full and cheap searches
    #[arg(long, default_value_t = central().selfplay.playout_cap_enabled, action = ArgAction::Set)]
    pub playout_cap: bool,

    #[arg(long, default_value_t = central().selfplay.playout_cap_big)]
    pub playout_cap_big: u32,

    #[arg(long, default_value_t = central().selfplay.playout_cap_small)]
    pub playout_cap_small: u32,

    /// Probability of a full search on each ply
    #[arg(long, default_value_t = central().selfplay.playout_cap_frac)]
    pub playout_cap_frac: f64,

    /// Play proven forced wins without searching
    #[arg(long, default_value_t = central().selfplay.search_checkmate, action = ArgAction::Set)]
    pub search_checkmate: bool,

    #[arg(long, default_value_t = central().selfplay.mate_plies)]
    pub mate_plies: u32,

    #[arg(long, default_value_t = central().selfplay.stop_with_checkmate, action = ArgAction::Set)]
    pub stop_with_checkmate: bool,

    #[arg(long, default_value_t = central().selfplay.trim_checkmate, action = ArgAction::Set)]
    pub trim_checkmate: bool,

    /// Play random legal moves instead of searching
    #[arg(long, default_value_t = central().selfplay.random_play, action = ArgAction::Set)]
    pub random_play: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.actor_id.is_empty() {
            return Err(anyhow!("actor_id cannot be empty"));
        }

        if !SUPPORTED_ENVS.contains(&self.env_id.as_str()) {
            return Err(anyhow!(
                "unknown env_id '{}', expected one of {:?}",
                self.env_id,
                SUPPORTED_ENVS
            ));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        if self.num_workers == 0 {
            return Err(anyhow!("num_workers must be greater than 0"));
        }

        if self.node_capacity == 0 {
            return Err(anyhow!("node_capacity must be greater than 0"));
        }

        if self.max_moves == 0 {
            return Err(anyhow!("max_moves must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.playout_cap_frac) {
            return Err(anyhow!(
                "playout_cap_frac must be in [0, 1], got {}",
                self.playout_cap_frac
            ));
        }

        self.search_config()
            .validate()
            .map_err(|e| anyhow!("invalid search config: {}", e))?;

        Ok(())
    }

    /// Search config used by every worker, before playout-cap adjustments.
    pub fn search_config(&self) -> MctsConfig {
        let mut config = MctsConfig::for_training()
            .with_simulations(self.simulation_num)
            .with_batch_size(self.batch_size)
            .with_dirichlet(self.dirichlet_alpha as f32, self.dirichlet_frac as f32)
            .with_memory_threshold(self.memory_threshold as f32)
            .with_verbose(self.verbose);
        config.c_base = self.c_base as f32;
        config.c_init = self.c_init as f32;
        config.forced_playout_k = self.forced_playout_k as f32;
        if self.time_limit_ms > 0 {
            config = config.with_time_limit(Duration::from_millis(self.time_limit_ms));
        }
        config
    }

    pub fn selfplay_config(&self) -> SelfPlayConfig {
        SelfPlayConfig {
            max_moves: self.max_moves,
            num_sampling_moves: self.num_sampling_moves,
            temperature: self.temperature as f32,
            playout_cap: PlayoutCap {
                enabled: self.playout_cap,
                big: self.playout_cap_big,
                small: self.playout_cap_small,
                frac: self.playout_cap_frac,
            },
            search_checkmate: self.search_checkmate,
            mate_plies: self.mate_plies,
            stop_with_checkmate: self.stop_with_checkmate,
            trim_checkmate: self.trim_checkmate,
            random_play: self.random_play,
        }
    }

    pub fn records_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.records_file)
    }

    pub fn stats_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.stats_file)
    }
}
