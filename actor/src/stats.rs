//! Actor statistics tracking and persistence.
//!
//! Counters are updated lock-free by every worker and periodically written
//! to a JSON snapshot file next to the game records.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::selfplay::PlayedGame;

/// Aggregated actor statistics, designed for lock-free updates.
#[derive(Debug)]
pub struct ActorStats {
    games_completed: AtomicU64,
    total_plies: AtomicU64,
    first_wins: AtomicU64,
    second_wins: AtomicU64,
    draws: AtomicU64,
    /// Plies recorded as training targets
    learning_targets: AtomicU64,
    /// Plies played from the mate solver without searching
    mate_shortcuts: AtomicU64,
    searches: AtomicU64,
    inference_us: AtomicU64,
    start_time: Instant,
    stats_path: PathBuf,
    env_id: String,
}

/// Serializable stats for JSON output.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActorStatsSnapshot {
    pub env_id: String,
    pub games_completed: u64,
    pub total_plies: u64,
    pub first_wins: u64,
    pub second_wins: u64,
    pub draws: u64,
    pub learning_targets: u64,
    pub mate_shortcuts: u64,
    pub avg_game_length: f64,
    pub games_per_second: f64,
    pub runtime_seconds: f64,
    pub avg_inference_us: f64,
    pub timestamp: u64,
}

impl ActorStats {
    /// Create a tracker writing its snapshots to `stats_path`.
    pub fn new(stats_path: impl Into<PathBuf>, env_id: &str) -> Self {
        let stats_path = stats_path.into();
        if let Some(dir) = stats_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create stats directory: {}", e);
            }
        }

        Self {
            games_completed: AtomicU64::new(0),
            total_plies: AtomicU64::new(0),
            first_wins: AtomicU64::new(0),
            second_wins: AtomicU64::new(0),
            draws: AtomicU64::new(0),
            learning_targets: AtomicU64::new(0),
            mate_shortcuts: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            inference_us: AtomicU64::new(0),
            start_time: Instant::now(),
            stats_path,
            env_id: env_id.to_string(),
        }
    }

    /// Record a finished game.
    pub fn record_game(&self, game: &PlayedGame) {
        let record = &game.record;
        self.games_completed.fetch_add(1, Ordering::Relaxed);
        self.total_plies
            .fetch_add(record.ply as u64, Ordering::Relaxed);
        self.learning_targets
            .fetch_add(record.learning_target_plys.len() as u64, Ordering::Relaxed);

        let outcome = if record.is_draw() {
            &self.draws
        } else if record.winner == 0 {
            &self.first_wins
        } else {
            &self.second_wins
        };
        outcome.fetch_add(1, Ordering::Relaxed);

        let stats = &game.stats;
        self.mate_shortcuts
            .fetch_add(stats.mate_shortcuts as u64, Ordering::Relaxed);
        self.searches
            .fetch_add(stats.searches as u64, Ordering::Relaxed);
        self.inference_us
            .fetch_add(stats.inference_time_us, Ordering::Relaxed);
    }

    pub fn games_completed(&self) -> u64 {
        self.games_completed.load(Ordering::Relaxed)
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> ActorStatsSnapshot {
        let games = self.games_completed.load(Ordering::Relaxed);
        let plies = self.total_plies.load(Ordering::Relaxed);
        let runtime = self.start_time.elapsed().as_secs_f64();
        let searches = self.searches.load(Ordering::Relaxed);
        let inference_us = self.inference_us.load(Ordering::Relaxed);

        let avg_game_length = if games > 0 {
            plies as f64 / games as f64
        } else {
            0.0
        };
        let games_per_second = if runtime > 0.0 {
            games as f64 / runtime
        } else {
            0.0
        };
        let avg_inference_us = if searches > 0 {
            inference_us as f64 / searches as f64
        } else {
            0.0
        };

        ActorStatsSnapshot {
            env_id: self.env_id.clone(),
            games_completed: games,
            total_plies: plies,
            first_wins: self.first_wins.load(Ordering::Relaxed),
            second_wins: self.second_wins.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            learning_targets: self.learning_targets.load(Ordering::Relaxed),
            mate_shortcuts: self.mate_shortcuts.load(Ordering::Relaxed),
            avg_game_length,
            games_per_second,
            runtime_seconds: runtime,
            avg_inference_us,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to the JSON file (write-then-rename).
    pub fn write_stats(&self) {
        let json = match serde_json::to_string_pretty(&self.snapshot()) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize actor stats: {}", e);
                return;
            }
        };

        let temp_path = self.stats_path.with_extension("json.tmp");
        let written = fs::File::create(&temp_path).and_then(|mut f| f.write_all(json.as_bytes()));
        if let Err(e) = written {
            warn!("Failed to write actor stats: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        if let Err(e) = fs::rename(&temp_path, &self.stats_path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote actor stats to {}", self.stats_path.display());
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameRecord, DRAW};
    use crate::selfplay::GameStats;
    use tempfile::tempdir;

    fn game(plies: u32, winner: u8, targets: u32) -> PlayedGame {
        let record = GameRecord {
            ply: plies,
            learning_target_plys: (0..targets).collect(),
            winner,
            ..GameRecord::default()
        };
        PlayedGame {
            record,
            stats: GameStats::default(),
        }
    }

    fn tracker(dir: &Path) -> ActorStats {
        ActorStats::new(dir.join("actor_stats.json"), "tictactoe")
    }

    #[test]
    fn test_record_game_outcomes() {
        let dir = tempdir().unwrap();
        let stats = tracker(dir.path());

        stats.record_game(&game(9, 0, 9));
        stats.record_game(&game(8, 1, 2));
        stats.record_game(&game(9, DRAW, 0));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.games_completed, 3);
        assert_eq!(snapshot.first_wins, 1);
        assert_eq!(snapshot.second_wins, 1);
        assert_eq!(snapshot.draws, 1);
        assert_eq!(snapshot.total_plies, 26);
        assert_eq!(snapshot.learning_targets, 11);
    }

    #[test]
    fn test_search_stats_accumulation() {
        let dir = tempdir().unwrap();
        let stats = tracker(dir.path());

        let mut played = game(5, 0, 5);
        played.stats.searches = 10;
        played.stats.inference_time_us = 1000;
        played.stats.mate_shortcuts = 1;
        stats.record_game(&played);

        played.stats.searches = 20;
        played.stats.inference_time_us = 3000;
        stats.record_game(&played);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.mate_shortcuts, 2);
        let expected_avg = 4000.0 / 30.0;
        assert!((snapshot.avg_inference_us - expected_avg).abs() < 0.1);
    }

    #[test]
    fn test_averages_with_zero_games() {
        let dir = tempdir().unwrap();
        let snapshot = tracker(dir.path()).snapshot();

        assert_eq!(snapshot.games_completed, 0);
        assert_eq!(snapshot.avg_game_length, 0.0);
        assert_eq!(snapshot.avg_inference_us, 0.0);
    }

    #[test]
    fn test_avg_game_length() {
        let dir = tempdir().unwrap();
        let stats = tracker(dir.path());

        stats.record_game(&game(6, 0, 0));
        stats.record_game(&game(10, 1, 0));
        stats.record_game(&game(8, DRAW, 0));

        assert!((stats.snapshot().avg_game_length - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_write_stats_replaces_file() {
        let dir = tempdir().unwrap();
        let stats = ActorStats::new(dir.path().join("nested").join("stats.json"), "tictactoe");

        stats.record_game(&game(5, 0, 5));
        stats.write_stats();

        let content = fs::read_to_string(stats.stats_path()).unwrap();
        let parsed: ActorStatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.games_completed, 1);
        assert_eq!(parsed.env_id, "tictactoe");

        stats.record_game(&game(7, 1, 7));
        stats.write_stats();

        let content = fs::read_to_string(stats.stats_path()).unwrap();
        let parsed: ActorStatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.games_completed, 2);
        assert!(!stats.stats_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempdir().unwrap();
        let stats = Arc::new(tracker(dir.path()));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_game(&game(5, 0, 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.games_completed, 1000);
        assert_eq!(snapshot.learning_targets, 1000);
    }
}
