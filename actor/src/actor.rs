//! Actor: a pool of self-play workers sharing one evaluator

use anyhow::{anyhow, Result};
use engine_core::Position;
use games_tictactoe::TicTacToe;
use indicatif::{ProgressBar, ProgressStyle};
use mcts::{Evaluator, MctsSearch, StopToken, UniformEvaluator};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::record::RecordWriter;
use crate::selfplay::{PlayedGame, SelfPlay};
use crate::stats::ActorStats;

pub struct Actor {
    config: Config,
    evaluator: Arc<dyn Evaluator>,
    writer: Mutex<RecordWriter>,
    stats: ActorStats,
    games_claimed: AtomicU64,
    stop: StopToken,
}

impl Actor {
    /// Actor with the built-in uniform evaluator.
    pub fn new(config: Config) -> Result<Self> {
        let evaluator = Arc::new(UniformEvaluator::new(TicTacToe::policy_size()));
        Self::with_evaluator(config, evaluator)
    }

    pub fn with_evaluator(config: Config, evaluator: Arc<dyn Evaluator>) -> Result<Self> {
        config.validate()?;

        let writer = RecordWriter::open(config.records_path())?;
        let stats = ActorStats::new(config.stats_path(), &config.env_id);
        info!(
            actor_id = %config.actor_id,
            env_id = %config.env_id,
            records = %writer.path().display(),
            stats = %stats.stats_path().display(),
            "Actor initialized"
        );

        let search = config.search_config();
        info!(
            "MCTS config: {} simulations, batch_size={}, playout_cap={}, workers={}",
            search.simulation_num, search.batch_size, config.playout_cap, config.num_workers
        );

        Ok(Self {
            config,
            evaluator,
            writer: Mutex::new(writer),
            stats,
            games_claimed: AtomicU64::new(0),
            stop: StopToken::new(),
        })
    }

    /// Run every worker to completion.
    ///
    /// Returns when `max_games` games are recorded or after `shutdown`.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!(
            actor_id = %self.config.actor_id,
            max_games = self.config.max_games,
            num_workers = self.config.num_workers,
            "Actor starting workers"
        );

        // Progress bar for bounded runs (only when stderr is a TTY)
        let progress = if self.config.max_games > 0
            && std::io::IsTerminal::is_terminal(&std::io::stderr())
        {
            let pb = ProgressBar::new(self.config.max_games as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")
                    .map_err(|e| anyhow!("Invalid progress template: {}", e))?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let started = Instant::now();
        let handles: Vec<_> = (0..self.config.num_workers)
            .map(|worker| {
                let actor = Arc::clone(&self);
                let progress = progress.clone();
                tokio::task::spawn_blocking(move || actor.worker_loop(worker, progress.as_ref()))
            })
            .collect();

        let mut result = Ok(());
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!("Worker panicked: {}", e)),
            };
            if let Err(e) = outcome {
                error!("Worker failed: {}", e);
                self.stop.stop();
                result = Err(e);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }
        self.stats.write_stats();

        let written = self.writer.lock().map(|w| w.written()).unwrap_or_default();
        let snapshot = self.stats.snapshot();
        info!(
            records = written,
            games = snapshot.games_completed,
            plies = snapshot.total_plies,
            first_wins = snapshot.first_wins,
            second_wins = snapshot.second_wins,
            draws = snapshot.draws,
            elapsed = format!("{:.1}s", started.elapsed().as_secs_f64()),
            "Actor stopped"
        );
        result
    }

    /// Stop all workers at their next search round.
    pub fn shutdown(&self) {
        self.stop.stop();
        info!("Shutdown signal set");
    }

    #[cfg(test)]
    pub fn stats(&self) -> &ActorStats {
        &self.stats
    }

    fn worker_loop(&self, worker: usize, progress: Option<&ProgressBar>) -> Result<()> {
        let mut rng = self.worker_rng(worker);
        let mut selfplay = SelfPlay::new(
            MctsSearch::<TicTacToe>::with_capacity(self.config.node_capacity),
            self.config.search_config(),
            self.config.selfplay_config(),
        );
        debug!(worker, "worker started");

        while self.claim_game() {
            let start = Instant::now();
            match selfplay.play(&TicTacToe::new(), &*self.evaluator, &mut rng, &self.stop) {
                Ok(Some(game)) => self.finish_game(worker, game, start.elapsed(), progress)?,
                Ok(None) => break,
                Err(e) => {
                    // Evaluator failures are fatal: stop the other workers too
                    self.stop.stop();
                    return Err(anyhow!(e).context(format!("worker {} game failed", worker)));
                }
            }
        }

        debug!(worker, "worker stopped");
        Ok(())
    }

    /// Reserve one game of the `max_games` budget.
    fn claim_game(&self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        if self.config.max_games < 0 {
            return true;
        }
        self.games_claimed.fetch_add(1, Ordering::Relaxed) < self.config.max_games as u64
    }

    fn worker_rng(&self, worker: usize) -> ChaCha20Rng {
        if self.config.seed == 0 {
            ChaCha20Rng::from_entropy()
        } else {
            ChaCha20Rng::seed_from_u64(self.config.seed.wrapping_add(worker as u64))
        }
    }

    fn finish_game(
        &self,
        worker: usize,
        game: PlayedGame,
        duration: Duration,
        progress: Option<&ProgressBar>,
    ) -> Result<()> {
        self.writer
            .lock()
            .map_err(|e| anyhow!("Record writer lock poisoned: {}", e))?
            .write(&game.record)?;
        self.stats.record_game(&game);

        let count = self.stats.games_completed();
        debug!(
            worker,
            game = count,
            plies = game.record.ply,
            winner = game.record.winner,
            duration = duration.as_secs_f64(),
            "Game completed"
        );

        if let Some(pb) = progress {
            pb.inc(1);
        }

        let log_interval = self.config.log_interval as u64;
        if log_interval > 0 && count % log_interval == 0 {
            let log = || {
                info!(
                    "Completed {} games (last: {:.2}s, {} plies)",
                    count,
                    duration.as_secs_f64(),
                    game.record.ply
                );
                game.stats.log_summary(count);
            };
            match progress {
                Some(pb) => pb.suspend(log),
                None => log(),
            }
            self.stats.write_stats();
        }
        Ok(())
    }
}
