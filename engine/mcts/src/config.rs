//! MCTS configuration parameters.

use std::time::Duration;

use crate::search::SearchError;

/// Configuration for one search invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Simulation budget. The search runs `simulation_num / batch_size`
    /// rounds; a remainder is not simulated.
    pub simulation_num: u32,

    /// Leaves selected per round and evaluated in one evaluator call.
    pub batch_size: u32,

    /// Perturb the root priors with Dirichlet noise when the root is expanded.
    pub use_dirichlet: bool,

    /// Dirichlet concentration parameter.
    pub dirichlet_alpha: f32,

    /// Fraction of each root prior replaced by noise.
    /// 0.25 means 75% prior + 25% noise.
    pub dirichlet_frac: f32,

    /// Force a minimum number of visits on root children with high priors.
    pub forced_playouts: bool,

    /// Forced-playout constant k in `sqrt(k * P * parent_N)`.
    pub forced_playout_k: f32,

    /// Re-root the previous tree at the played move instead of starting over.
    pub reuse_tree: bool,

    /// Subtract forced-playout visits from the dumped training target.
    pub target_pruning: bool,

    /// Return without searching when the root already has `simulation_num`
    /// playouts.
    pub immediate: bool,

    /// Wall-clock limit, checked once per round.
    pub time_limit: Option<Duration>,

    /// Stop issuing rounds once tree usage exceeds this fraction.
    pub memory_threshold: f32,

    /// PUCT c_base.
    pub c_base: f32,

    /// PUCT c_init.
    pub c_init: f32,

    /// Log a `SearchInfo` line every `INFO_INTERVAL` rounds and at the end.
    pub verbose: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            simulation_num: 800,
            batch_size: 16,
            use_dirichlet: false,
            dirichlet_alpha: 0.34,
            dirichlet_frac: 0.25,
            forced_playouts: false,
            forced_playout_k: 2.0,
            reuse_tree: true,
            target_pruning: false,
            immediate: false,
            time_limit: None,
            memory_threshold: 0.9,
            c_base: 19652.0,
            c_init: 1.25,
            verbose: false,
        }
    }
}

impl MctsConfig {
    /// Full-strength search producing a training target: noise, forced
    /// playouts and target pruning on, no tree reuse.
    pub fn for_training() -> Self {
        Self {
            use_dirichlet: true,
            forced_playouts: true,
            reuse_tree: false,
            target_pruning: true,
            immediate: false,
            ..Self::default()
        }
    }

    /// Cheap search used only to pick a move: reuses the tree and returns
    /// immediately when it already holds enough playouts.
    pub fn for_fast_move(simulation_num: u32) -> Self {
        Self {
            simulation_num,
            use_dirichlet: false,
            forced_playouts: false,
            reuse_tree: true,
            target_pruning: false,
            immediate: true,
            ..Self::default()
        }
    }

    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            simulation_num: 64,
            batch_size: 8,
            reuse_tree: false,
            ..Self::default()
        }
    }

    /// Builder pattern: set simulation budget.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.simulation_num = n;
        self
    }

    /// Builder pattern: set batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder pattern: enable or disable root noise.
    pub fn with_dirichlet(mut self, alpha: f32, frac: f32) -> Self {
        self.use_dirichlet = true;
        self.dirichlet_alpha = alpha;
        self.dirichlet_frac = frac;
        self
    }

    pub fn with_forced_playouts(mut self, enabled: bool) -> Self {
        self.forced_playouts = enabled;
        self
    }

    pub fn with_reuse_tree(mut self, enabled: bool) -> Self {
        self.reuse_tree = enabled;
        self
    }

    pub fn with_target_pruning(mut self, enabled: bool) -> Self {
        self.target_pruning = enabled;
        self
    }

    pub fn with_immediate(mut self, enabled: bool) -> Self {
        self.immediate = enabled;
        self
    }

    /// Builder pattern: set the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_memory_threshold(mut self, threshold: f32) -> Self {
        self.memory_threshold = threshold;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of simulation rounds this config runs.
    pub fn rounds(&self) -> u32 {
        self.simulation_num / self.batch_size.max(1)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.batch_size == 0 {
            return Err(SearchError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.use_dirichlet && !(self.dirichlet_alpha > 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "dirichlet_alpha must be positive, got {}",
                self.dirichlet_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.dirichlet_frac) {
            return Err(SearchError::InvalidConfig(format!(
                "dirichlet_frac must be in [0, 1], got {}",
                self.dirichlet_frac
            )));
        }
        if !(self.memory_threshold > 0.0 && self.memory_threshold <= 1.0) {
            return Err(SearchError::InvalidConfig(format!(
                "memory_threshold must be in (0, 1], got {}",
                self.memory_threshold
            )));
        }
        if !(self.c_base > 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "c_base must be positive, got {}",
                self.c_base
            )));
        }
        if !(self.forced_playout_k > 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "forced_playout_k must be positive, got {}",
                self.forced_playout_k
            )));
        }
        Ok(())
    }
}
