//! Self-play game loop.
//!
//! One `SelfPlay` owns a search tree and plays complete games with it:
//!
//! 1. A terminal position (repetition or no legal moves) ends the game and
//!    decides the winner.
//! 2. A forced win found by the mate solver is played without searching.
//! 3. Otherwise the tree is searched, using playout-cap oscillation when
//!    enabled: a full search with noise and forced playouts on a fraction of
//!    the plies, a cheap tree-reusing search on the rest.
//! 4. The first `num_sampling_moves` plies sample from the visit counts,
//!    later plies play the most visited move.

use engine_core::{BoundedMateSolver, Color, MateSolver, Position};
use mcts::{
    Dump, Evaluator, MctsConfig, MctsSearch, MoveChoice, SearchError, SearchStats, StopReason,
    StopToken,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, trace};

use crate::record::{GameRecord, DRAW};

/// Playout-cap oscillation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayoutCap {
    pub enabled: bool,
    /// Simulations of a full search
    pub big: u32,
    /// Simulations of a cheap search
    pub small: u32,
    /// Probability that a ply gets a full search
    pub frac: f64,
}

impl Default for PlayoutCap {
    fn default() -> Self {
        Self {
            enabled: false,
            big: 800,
            small: 128,
            frac: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfPlayConfig {
    pub max_moves: u32,
    pub num_sampling_moves: u32,
    pub temperature: f32,
    pub playout_cap: PlayoutCap,
    pub search_checkmate: bool,
    pub mate_plies: u32,
    /// End the game as soon as a forced win is found
    pub stop_with_checkmate: bool,
    /// Drop the final two plies of a game ended by a found mate
    pub trim_checkmate: bool,
    /// Play random legal moves instead of searching
    pub random_play: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            max_moves: 512,
            num_sampling_moves: 10,
            temperature: 1.0,
            playout_cap: PlayoutCap::default(),
            search_checkmate: true,
            mate_plies: 7,
            stop_with_checkmate: false,
            trim_checkmate: false,
            random_play: false,
        }
    }
}

/// Search statistics aggregated over one game.
#[derive(Debug, Default, Clone)]
pub struct GameStats {
    /// Searches run
    pub searches: u32,
    /// Searches that ran the full playout budget
    pub big_searches: u32,
    /// Plies played straight from the mate solver
    pub mate_shortcuts: u32,
    /// Searches that returned without simulating
    pub immediate_returns: u32,
    pub total_time_us: u64,
    pub selection_time_us: u64,
    pub inference_time_us: u64,
    pub expansion_time_us: u64,
    pub backprop_time_us: u64,
    /// Evaluator batch calls
    pub batches: u32,
    /// Positions evaluated
    pub evaluations: u32,
    pub terminal_hits: u32,
    pub duplicate_leaves: u32,
}

impl GameStats {
    /// Add stats from a single search.
    pub fn add(&mut self, stats: &SearchStats, big: bool) {
        self.searches += 1;
        if big {
            self.big_searches += 1;
        }
        if stats.stop_reason == StopReason::Immediate {
            self.immediate_returns += 1;
        }
        self.total_time_us += stats.total_time_us;
        self.selection_time_us += stats.selection_time_us;
        self.inference_time_us += stats.inference_time_us;
        self.expansion_time_us += stats.expansion_time_us;
        self.backprop_time_us += stats.backprop_time_us;
        self.batches += stats.batches;
        self.evaluations += stats.evaluations;
        self.terminal_hits += stats.terminal_hits;
        self.duplicate_leaves += stats.duplicate_leaves;
    }

    /// Log a breakdown of where search time went.
    pub fn log_summary(&self, game: u64) {
        if self.searches == 0 || self.total_time_us == 0 {
            return;
        }

        let total = self.total_time_us as f64;
        let pct = |us: u64| format!("{:.1}%", us as f64 / total * 100.0);
        let avg_batch_size = if self.batches > 0 {
            self.evaluations as f64 / self.batches as f64
        } else {
            0.0
        };

        info!(
            game,
            searches = self.searches,
            big_searches = self.big_searches,
            mate_shortcuts = self.mate_shortcuts,
            immediate_returns = self.immediate_returns,
            total_ms = format!("{:.1}", total / 1000.0),
            inference_pct = pct(self.inference_time_us),
            expansion_pct = pct(self.expansion_time_us),
            selection_pct = pct(self.selection_time_us),
            backprop_pct = pct(self.backprop_time_us),
            batches = self.batches,
            avg_batch_size = format!("{:.1}", avg_batch_size),
            terminal_hits = self.terminal_hits,
            duplicate_leaves = self.duplicate_leaves,
            "search stats"
        );
    }
}

/// A finished game with the statistics of the searches that produced it.
#[derive(Debug, Clone)]
pub struct PlayedGame {
    pub record: GameRecord,
    pub stats: GameStats,
}

/// One ply chosen by the mate solver, the search or at random.
struct Ply<M> {
    choice: MoveChoice<M>,
    dump: Dump,
    learning_target: bool,
}

/// Winner byte for a terminal value seen by `side`.
pub fn winner_of(side: Color, value: f32) -> u8 {
    if value > 0.5 {
        side.index()
    } else if value < 0.5 {
        side.opponent().index()
    } else {
        DRAW
    }
}

/// Plays self-play games with a private search tree.
pub struct SelfPlay<P: Position> {
    search: MctsSearch<P>,
    solver: BoundedMateSolver,
    base: MctsConfig,
    config: SelfPlayConfig,
}

impl<P: Position> SelfPlay<P> {
    /// `base` is the search config used when playout-cap oscillation is off,
    /// and the template of both oscillation configs when it is on.
    pub fn new(search: MctsSearch<P>, base: MctsConfig, config: SelfPlayConfig) -> Self {
        Self {
            search,
            solver: BoundedMateSolver::new(config.mate_plies),
            base,
            config,
        }
    }

    /// Search config of a full (`big`) or cheap oscillation search.
    pub fn search_config(&self, big: bool) -> MctsConfig {
        let cap = &self.config.playout_cap;
        if !cap.enabled {
            return self.base.clone();
        }
        if big {
            MctsConfig {
                simulation_num: cap.big,
                use_dirichlet: true,
                forced_playouts: true,
                reuse_tree: false,
                target_pruning: true,
                immediate: false,
                ..self.base.clone()
            }
        } else {
            MctsConfig {
                simulation_num: cap.small,
                use_dirichlet: false,
                forced_playouts: false,
                reuse_tree: true,
                target_pruning: false,
                immediate: true,
                ..self.base.clone()
            }
        }
    }

    /// Play one game from `start`.
    ///
    /// Returns `Ok(None)` when `stop` is raised before the game ends; the
    /// partial game is discarded.
    pub fn play<E, R>(
        &mut self,
        start: &P,
        evaluator: &E,
        rng: &mut R,
        stop: &StopToken,
    ) -> Result<Option<PlayedGame>, SearchError>
    where
        E: Evaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let mut position = start.clone();
        let mut record = GameRecord::new();
        let mut stats = GameStats::default();
        self.search.clear(false);

        while record.ply < self.config.max_moves {
            if stop.is_stopped() {
                return Ok(None);
            }

            let side = position.side_to_move();
            if let Some(value) = position.terminal_value() {
                record.winner = winner_of(side, value);
                break;
            }

            let ply = match self.find_mate(&position) {
                Some(mv) => {
                    stats.mate_shortcuts += 1;
                    if !self.config.stop_with_checkmate {
                        self.search.clear(false);
                    }
                    Ply {
                        choice: MoveChoice::Checkmate(mv),
                        dump: Dump::certain(mv),
                        learning_target: true,
                    }
                }
                None if self.config.random_play => random_ply(&position, rng),
                None => {
                    let searched =
                        self.search_ply(&position, record.ply, evaluator, rng, stop, &mut stats)?;
                    match searched {
                        Some(ply) => ply,
                        None => return Ok(None),
                    }
                }
            };

            let mate = matches!(ply.choice, MoveChoice::Checkmate(_));
            let Some(mv) = ply.choice.mv() else {
                debug!(ply = record.ply, side = ?side, "no move found, resigning");
                record.set_winner(side.opponent());
                break;
            };

            trace!(ply = record.ply, mv = %mv, mate, "move played");
            record.push(mv.to_string(), ply.dump, ply.learning_target);
            position = position.apply(mv);

            if mate && self.config.stop_with_checkmate {
                record.set_winner(side);
                if self.config.trim_checkmate {
                    record.trim(2);
                }
                break;
            }
        }

        record.finish();
        debug!(
            plies = record.ply,
            winner = record.winner,
            learning_targets = record.learning_target_plys.len(),
            "game finished"
        );
        Ok(Some(PlayedGame { record, stats }))
    }

    fn find_mate(&self, position: &P) -> Option<P::Move> {
        if self.config.search_checkmate || self.config.random_play {
            self.solver.solve(position)
        } else {
            None
        }
    }

    fn search_ply<E, R>(
        &mut self,
        position: &P,
        ply: u32,
        evaluator: &E,
        rng: &mut R,
        stop: &StopToken,
        stats: &mut GameStats,
    ) -> Result<Option<Ply<P::Move>>, SearchError>
    where
        E: Evaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let cap = &self.config.playout_cap;
        let big = cap.enabled && rng.gen::<f64>() < cap.frac;
        let config = self.search_config(big);

        let root = self.search.run(position, evaluator, &config, rng, stop)?;
        stats.add(self.search.stats(), big);
        if self.search.stats().stop_reason == StopReason::Stopped {
            return Ok(None);
        }

        let choice = if ply < self.config.num_sampling_moves {
            self.search.softmax_sample(root, self.config.temperature, rng)
        } else {
            self.search.best_move(root)
        };

        Ok(Some(Ply {
            choice,
            dump: self.search.dump(root, &config, true),
            learning_target: !cap.enabled || big,
        }))
    }
}

fn random_ply<P: Position, R: Rng + ?Sized>(position: &P, rng: &mut R) -> Ply<P::Move> {
    let mv = position.legal_moves().choose(rng).copied();
    let dump = match mv {
        Some(mv) => Dump {
            sum_visits: 1,
            q: 0.5,
            distribution: vec![(mv.to_string(), 1)],
        },
        None => Dump {
            sum_visits: 0,
            q: 0.5,
            distribution: Vec::new(),
        },
    };
    Ply {
        choice: mv.map_or(MoveChoice::Resign, MoveChoice::Normal),
        dump,
        learning_target: true,
    }
}
