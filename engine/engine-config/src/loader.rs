//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MINIZERO_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from subdirectory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the MINIZERO_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_ENV_VAR, path.display());
            return load_from_path(&path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// Unreadable or malformed files fall back to the built-in defaults with a
/// warning.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(raw) = std::env::var($key) {
            match raw.parse() {
                Ok(v) => $config.$section.$field = v,
                Err(_) => warn!("Ignoring {}={}: not a valid value", $key, raw),
            }
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: MINIZERO_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.env_id, "MINIZERO_COMMON_ENV_ID");
    env_override!(config, common.data_dir, "MINIZERO_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "MINIZERO_COMMON_LOG_LEVEL");

    // Actor
    env_override!(config, actor.actor_id, "MINIZERO_ACTOR_ACTOR_ID");
    env_override!(config, actor.num_workers, "MINIZERO_ACTOR_NUM_WORKERS", parse);
    env_override!(config, actor.max_games, "MINIZERO_ACTOR_MAX_GAMES", parse);
    env_override!(config, actor.log_interval, "MINIZERO_ACTOR_LOG_INTERVAL", parse);
    env_override!(config, actor.seed, "MINIZERO_ACTOR_SEED", parse);
    env_override!(config, actor.records_file, "MINIZERO_ACTOR_RECORDS_FILE");
    env_override!(config, actor.stats_file, "MINIZERO_ACTOR_STATS_FILE");

    // MCTS
    env_override!(
        config,
        mcts.simulation_num,
        "MINIZERO_MCTS_SIMULATION_NUM",
        parse
    );
    env_override!(config, mcts.batch_size, "MINIZERO_MCTS_BATCH_SIZE", parse);
    env_override!(config, mcts.c_base, "MINIZERO_MCTS_C_BASE", parse);
    env_override!(config, mcts.c_init, "MINIZERO_MCTS_C_INIT", parse);
    env_override!(
        config,
        mcts.dirichlet_alpha,
        "MINIZERO_MCTS_DIRICHLET_ALPHA",
        parse
    );
    env_override!(
        config,
        mcts.dirichlet_frac,
        "MINIZERO_MCTS_DIRICHLET_FRAC",
        parse
    );
    env_override!(
        config,
        mcts.forced_playout_k,
        "MINIZERO_MCTS_FORCED_PLAYOUT_K",
        parse
    );
    env_override!(
        config,
        mcts.memory_threshold,
        "MINIZERO_MCTS_MEMORY_THRESHOLD",
        parse
    );
    env_override!(
        config,
        mcts.node_capacity,
        "MINIZERO_MCTS_NODE_CAPACITY",
        parse
    );
    env_override!(
        config,
        mcts.time_limit_ms,
        "MINIZERO_MCTS_TIME_LIMIT_MS",
        parse
    );
    env_override!(config, mcts.verbose, "MINIZERO_MCTS_VERBOSE", parse);

    // Self-play
    env_override!(
        config,
        selfplay.max_moves,
        "MINIZERO_SELFPLAY_MAX_MOVES",
        parse
    );
    env_override!(
        config,
        selfplay.num_sampling_moves,
        "MINIZERO_SELFPLAY_NUM_SAMPLING_MOVES",
        parse
    );
    env_override!(
        config,
        selfplay.temperature,
        "MINIZERO_SELFPLAY_TEMPERATURE",
        parse
    );
    env_override!(
        config,
        selfplay.playout_cap_enabled,
        "MINIZERO_SELFPLAY_PLAYOUT_CAP_ENABLED",
        parse
    );
    env_override!(
        config,
        selfplay.playout_cap_big,
        "MINIZERO_SELFPLAY_PLAYOUT_CAP_BIG",
        parse
    );
    env_override!(
        config,
        selfplay.playout_cap_small,
        "MINIZERO_SELFPLAY_PLAYOUT_CAP_SMALL",
        parse
    );
    env_override!(
        config,
        selfplay.playout_cap_frac,
        "MINIZERO_SELFPLAY_PLAYOUT_CAP_FRAC",
        parse
    );
    env_override!(
        config,
        selfplay.search_checkmate,
        "MINIZERO_SELFPLAY_SEARCH_CHECKMATE",
        parse
    );
    env_override!(
        config,
        selfplay.mate_plies,
        "MINIZERO_SELFPLAY_MATE_PLIES",
        parse
    );
    env_override!(
        config,
        selfplay.stop_with_checkmate,
        "MINIZERO_SELFPLAY_STOP_WITH_CHECKMATE",
        parse
    );
    env_override!(
        config,
        selfplay.trim_checkmate,
        "MINIZERO_SELFPLAY_TRIM_CHECKMATE",
        parse
    );
    env_override!(
        config,
        selfplay.random_play,
        "MINIZERO_SELFPLAY_RANDOM_PLAY",
        parse
    );

    config
}
