//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_env_id() -> String {
    defaults::env_id().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_actor_id() -> String {
    defaults::actor_id().into()
}
fn d_num_workers() -> usize {
    defaults::num_workers()
}
fn d_max_games() -> i64 {
    defaults::max_games()
}
fn d_log_interval() -> u32 {
    defaults::log_interval()
}
fn d_seed() -> u64 {
    defaults::seed()
}
fn d_records_file() -> String {
    defaults::records_file().into()
}
fn d_stats_file() -> String {
    defaults::stats_file().into()
}
fn d_simulation_num() -> u32 {
    defaults::simulation_num()
}
fn d_batch_size() -> u32 {
    defaults::batch_size()
}
fn d_c_base() -> f64 {
    defaults::c_base()
}
fn d_c_init() -> f64 {
    defaults::c_init()
}
fn d_dirichlet_alpha() -> f64 {
    defaults::dirichlet_alpha()
}
fn d_dirichlet_frac() -> f64 {
    defaults::dirichlet_frac()
}
fn d_forced_playout_k() -> f64 {
    defaults::forced_playout_k()
}
fn d_memory_threshold() -> f64 {
    defaults::memory_threshold()
}
fn d_node_capacity() -> usize {
    defaults::node_capacity()
}
fn d_time_limit_ms() -> u64 {
    defaults::time_limit_ms()
}
fn d_verbose() -> bool {
    defaults::verbose()
}
fn d_max_moves() -> u32 {
    defaults::max_moves()
}
fn d_num_sampling_moves() -> u32 {
    defaults::num_sampling_moves()
}
fn d_temperature() -> f64 {
    defaults::temperature()
}
fn d_playout_cap_enabled() -> bool {
    defaults::playout_cap_enabled()
}
fn d_playout_cap_big() -> u32 {
    defaults::playout_cap_big()
}
fn d_playout_cap_small() -> u32 {
    defaults::playout_cap_small()
}
fn d_playout_cap_frac() -> f64 {
    defaults::playout_cap_frac()
}
fn d_search_checkmate() -> bool {
    defaults::search_checkmate()
}
fn d_mate_plies() -> u32 {
    defaults::mate_plies()
}
fn d_stop_with_checkmate() -> bool {
    defaults::stop_with_checkmate()
}
fn d_trim_checkmate() -> bool {
    defaults::trim_checkmate()
}
fn d_random_play() -> bool {
    defaults::random_play()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub actor: ActorConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub selfplay: SelfPlayConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_env_id")]
    pub env_id: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            env_id: defaults::env_id().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Actor (self-play driver) configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActorConfig {
    #[serde(default = "d_actor_id")]
    pub actor_id: String,
    #[serde(default = "d_num_workers")]
    pub num_workers: usize,
    /// Games to play; negative plays until interrupted
    #[serde(default = "d_max_games")]
    pub max_games: i64,
    #[serde(default = "d_log_interval")]
    pub log_interval: u32,
    /// RNG seed; 0 draws one from the OS
    #[serde(default = "d_seed")]
    pub seed: u64,
    /// Game records file (JSON lines), relative to `common.data_dir`
    #[serde(default = "d_records_file")]
    pub records_file: String,
    /// Statistics snapshot, relative to `common.data_dir`
    #[serde(default = "d_stats_file")]
    pub stats_file: String,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            actor_id: defaults::actor_id().into(),
            num_workers: defaults::num_workers(),
            max_games: defaults::max_games(),
            log_interval: defaults::log_interval(),
            seed: defaults::seed(),
            records_file: defaults::records_file().into(),
            stats_file: defaults::stats_file().into(),
        }
    }
}

/// Search configuration shared by every search a worker runs
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_simulation_num")]
    pub simulation_num: u32,
    #[serde(default = "d_batch_size")]
    pub batch_size: u32,
    #[serde(default = "d_c_base")]
    pub c_base: f64,
    #[serde(default = "d_c_init")]
    pub c_init: f64,
    #[serde(default = "d_dirichlet_alpha")]
    pub dirichlet_alpha: f64,
    #[serde(default = "d_dirichlet_frac")]
    pub dirichlet_frac: f64,
    #[serde(default = "d_forced_playout_k")]
    pub forced_playout_k: f64,
    #[serde(default = "d_memory_threshold")]
    pub memory_threshold: f64,
    /// Node budget of each worker's tree
    #[serde(default = "d_node_capacity")]
    pub node_capacity: usize,
    /// Per-search wall-clock limit; 0 disables it
    #[serde(default = "d_time_limit_ms")]
    pub time_limit_ms: u64,
    #[serde(default = "d_verbose")]
    pub verbose: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            simulation_num: defaults::simulation_num(),
            batch_size: defaults::batch_size(),
            c_base: defaults::c_base(),
            c_init: defaults::c_init(),
            dirichlet_alpha: defaults::dirichlet_alpha(),
            dirichlet_frac: defaults::dirichlet_frac(),
            forced_playout_k: defaults::forced_playout_k(),
            memory_threshold: defaults::memory_threshold(),
            node_capacity: defaults::node_capacity(),
            time_limit_ms: defaults::time_limit_ms(),
            verbose: defaults::verbose(),
        }
    }
}

/// Self-play game loop configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelfPlayConfig {
    #[serde(default = "d_max_moves")]
    pub max_moves: u32,
    /// Plies played by temperature sampling before switching to greedy
    #[serde(default = "d_num_sampling_moves")]
    pub num_sampling_moves: u32,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    #[serde(default = "d_playout_cap_enabled")]
    pub playout_cap_enabled: bool,
    /// Simulations of a full (learning-target) search
    #[serde(default = "d_playout_cap_big")]
    pub playout_cap_big: u32,
    /// Simulations of a fast move-only search
    #[serde(default = "d_playout_cap_small")]
    pub playout_cap_small: u32,
    /// Probability of a full search on each ply
    #[serde(default = "d_playout_cap_frac")]
    pub playout_cap_frac: f64,
    #[serde(default = "d_search_checkmate")]
    pub search_checkmate: bool,
    #[serde(default = "d_mate_plies")]
    pub mate_plies: u32,
    #[serde(default = "d_stop_with_checkmate")]
    pub stop_with_checkmate: bool,
    #[serde(default = "d_trim_checkmate")]
    pub trim_checkmate: bool,
    /// Play uniformly random moves instead of searching
    #[serde(default = "d_random_play")]
    pub random_play: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            max_moves: defaults::max_moves(),
            num_sampling_moves: defaults::num_sampling_moves(),
            temperature: defaults::temperature(),
            playout_cap_enabled: defaults::playout_cap_enabled(),
            playout_cap_big: defaults::playout_cap_big(),
            playout_cap_small: defaults::playout_cap_small(),
            playout_cap_frac: defaults::playout_cap_frac(),
            search_checkmate: defaults::search_checkmate(),
            mate_plies: defaults::mate_plies(),
            stop_with_checkmate: defaults::stop_with_checkmate(),
            trim_checkmate: defaults::trim_checkmate(),
            random_play: defaults::random_play(),
        }
    }
}
