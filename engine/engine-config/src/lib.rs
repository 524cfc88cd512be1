//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic of the
//! self-play actor.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`MINIZERO_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (`config.defaults.toml`, compiled in)
//!
//! Command-line flags of the actor sit above all three.
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! MINIZERO_<SECTION>_<KEY>=value
//!
//! Examples:
//!     MINIZERO_COMMON_DATA_DIR=/data
//!     MINIZERO_ACTOR_NUM_WORKERS=8
//!     MINIZERO_MCTS_SIMULATION_NUM=400
//!     MINIZERO_SELFPLAY_PLAYOUT_CAP_ENABLED=true
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_ENV_VAR, CONFIG_SEARCH_PATHS,
};
pub use structs::*;
