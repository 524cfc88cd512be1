//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so every binary agrees on
//! the same values without shipping the file.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    // The file is part of the build; a parse failure is caught by the tests.
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    actor: ActorDefaults,
    mcts: MctsDefaults,
    selfplay: SelfPlayDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    env_id: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct ActorDefaults {
    actor_id: String,
    num_workers: usize,
    max_games: i64,
    log_interval: u32,
    seed: u64,
    records_file: String,
    stats_file: String,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    simulation_num: u32,
    batch_size: u32,
    c_base: f64,
    c_init: f64,
    dirichlet_alpha: f64,
    dirichlet_frac: f64,
    forced_playout_k: f64,
    memory_threshold: f64,
    node_capacity: usize,
    time_limit_ms: u64,
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct SelfPlayDefaults {
    max_moves: u32,
    num_sampling_moves: u32,
    temperature: f64,
    playout_cap_enabled: bool,
    playout_cap_big: u32,
    playout_cap_small: u32,
    playout_cap_frac: f64,
    search_checkmate: bool,
    mate_plies: u32,
    stop_with_checkmate: bool,
    trim_checkmate: bool,
    random_play: bool,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn env_id() -> &'static str {
    &DEFAULTS.common.env_id
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Actor
pub fn actor_id() -> &'static str {
    &DEFAULTS.actor.actor_id
}
pub fn num_workers() -> usize {
    DEFAULTS.actor.num_workers
}
pub fn max_games() -> i64 {
    DEFAULTS.actor.max_games
}
pub fn log_interval() -> u32 {
    DEFAULTS.actor.log_interval
}
pub fn seed() -> u64 {
    DEFAULTS.actor.seed
}
pub fn records_file() -> &'static str {
    &DEFAULTS.actor.records_file
}
pub fn stats_file() -> &'static str {
    &DEFAULTS.actor.stats_file
}

// MCTS
pub fn simulation_num() -> u32 {
    DEFAULTS.mcts.simulation_num
}
pub fn batch_size() -> u32 {
    DEFAULTS.mcts.batch_size
}
pub fn c_base() -> f64 {
    DEFAULTS.mcts.c_base
}
pub fn c_init() -> f64 {
    DEFAULTS.mcts.c_init
}
pub fn dirichlet_alpha() -> f64 {
    DEFAULTS.mcts.dirichlet_alpha
}
pub fn dirichlet_frac() -> f64 {
    DEFAULTS.mcts.dirichlet_frac
}
pub fn forced_playout_k() -> f64 {
    DEFAULTS.mcts.forced_playout_k
}
pub fn memory_threshold() -> f64 {
    DEFAULTS.mcts.memory_threshold
}
pub fn node_capacity() -> usize {
    DEFAULTS.mcts.node_capacity
}
pub fn time_limit_ms() -> u64 {
    DEFAULTS.mcts.time_limit_ms
}
pub fn verbose() -> bool {
    DEFAULTS.mcts.verbose
}

// Self-play
pub fn max_moves() -> u32 {
    DEFAULTS.selfplay.max_moves
}
pub fn num_sampling_moves() -> u32 {
    DEFAULTS.selfplay.num_sampling_moves
}
pub fn temperature() -> f64 {
    DEFAULTS.selfplay.temperature
}
pub fn playout_cap_enabled() -> bool {
    DEFAULTS.selfplay.playout_cap_enabled
}
pub fn playout_cap_big() -> u32 {
    DEFAULTS.selfplay.playout_cap_big
}
pub fn playout_cap_small() -> u32 {
    DEFAULTS.selfplay.playout_cap_small
}
pub fn playout_cap_frac() -> f64 {
    DEFAULTS.selfplay.playout_cap_frac
}
pub fn search_checkmate() -> bool {
    DEFAULTS.selfplay.search_checkmate
}
pub fn mate_plies() -> u32 {
    DEFAULTS.selfplay.mate_plies
}
pub fn stop_with_checkmate() -> bool {
    DEFAULTS.selfplay.stop_with_checkmate
}
pub fn trim_checkmate() -> bool {
    DEFAULTS.selfplay.trim_checkmate
}
pub fn random_play() -> bool {
    DEFAULTS.selfplay.random_play
}
