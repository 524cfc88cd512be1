//! Self-play game records and their JSON-lines sink.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use engine_core::Color;
use mcts::Dump;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `winner` value of a drawn or unfinished game.
pub const DRAW: u8 = 2;

/// One self-play game: the move list, one search record per ply, the plies
/// usable as learning targets and the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Plies recorded
    pub ply: u32,
    /// Move identifiers in play order
    pub sfen_kif: Vec<String>,
    /// Search record per ply: `(sum_visits, q, [(move, visits), ...])`
    pub mcts_result: Vec<Dump>,
    /// Plies whose search record is a training target
    pub learning_target_plys: Vec<u32>,
    /// 0 = first player, 1 = second player, 2 = draw
    pub winner: u8,
    /// Unix time the game finished
    pub timestamp: u64,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self {
            ply: 0,
            sfen_kif: Vec::new(),
            mcts_result: Vec::new(),
            learning_target_plys: Vec::new(),
            winner: DRAW,
            timestamp: 0,
        }
    }
}

impl GameRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a played move with its search record.
    pub fn push(&mut self, mv: String, result: Dump, learning_target: bool) {
        if learning_target {
            self.learning_target_plys.push(self.ply);
        }
        self.sfen_kif.push(mv);
        self.mcts_result.push(result);
        self.ply += 1;
    }

    /// Drop the last `n` plies.
    pub fn trim(&mut self, n: u32) {
        let keep = self.ply.saturating_sub(n);
        self.ply = keep;
        self.sfen_kif.truncate(keep as usize);
        self.mcts_result.truncate(keep as usize);
        self.learning_target_plys.retain(|&p| p < keep);
    }

    /// Record a win for `color`.
    pub fn set_winner(&mut self, color: Color) {
        self.winner = color.index();
    }

    /// Stamp the finishing time.
    pub fn finish(&mut self) {
        self.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    pub fn is_draw(&self) -> bool {
        self.winner == DRAW
    }
}

/// Append-only JSON-lines file of game records.
pub struct RecordWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl RecordWriter {
    /// Open `path` for appending, creating it and its directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Write one record as a line and flush it.
    pub fn write(&mut self, record: &GameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        debug!(ply = record.ply, winner = record.winner, "wrote game record");
        Ok(())
    }

    /// Records written through this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    /// Read every record of a JSON-lines file.
    pub(crate) fn read_records(path: impl AsRef<Path>) -> Result<Vec<GameRecord>> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        BufReader::new(file)
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|line| Ok(serde_json::from_str(&line?)?))
            .collect()
    }

    fn sample() -> GameRecord {
        let mut record = GameRecord::new();
        record.push(
            "4".into(),
            Dump {
                sum_visits: 10,
                q: 0.5,
                distribution: vec![("4".into(), 7), ("0".into(), 3)],
            },
            true,
        );
        record.push("0".into(), Dump::certain("0"), false);
        record.set_winner(Color::First);
        record.finish();
        record
    }

    #[test]
    fn test_push_tracks_learning_targets() {
        let record = sample();
        assert_eq!(record.ply, 2);
        assert_eq!(record.sfen_kif, vec!["4", "0"]);
        assert_eq!(record.learning_target_plys, vec![0]);
        assert_eq!(record.winner, 0);
        assert!(record.timestamp > 0);
    }

    #[test]
    fn test_trim() {
        let mut record = sample();
        record.push("8".into(), Dump::certain("8"), true);
        record.trim(2);

        assert_eq!(record.ply, 1);
        assert_eq!(record.sfen_kif, vec!["4"]);
        assert_eq!(record.mcts_result.len(), 1);
        assert_eq!(record.learning_target_plys, vec![0]);

        record.trim(5);
        assert_eq!(record.ply, 0);
        assert!(record.learning_target_plys.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["ply"], 2);
        assert_eq!(json["winner"], 0);
        assert_eq!(json["mcts_result"][0][0], 10);
        assert_eq!(json["mcts_result"][0][2][0][0], "4");
        assert_eq!(json["mcts_result"][1], serde_json::json!([1, 1.0, [["0", 1]]]));
    }

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records").join("games.jsonl");

        let mut writer = RecordWriter::open(&path).unwrap();
        writer.write(&sample()).unwrap();
        writer.write(&GameRecord::new()).unwrap();
        assert_eq!(writer.written(), 2);
        drop(writer);

        // Reopening appends rather than truncating
        let mut writer = RecordWriter::open(&path).unwrap();
        writer.write(&sample()).unwrap();
        drop(writer);

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], sample_without_timestamp(&records[0]));
        assert!(records[1].is_draw());
    }

    fn sample_without_timestamp(read: &GameRecord) -> GameRecord {
        GameRecord {
            timestamp: read.timestamp,
            ..sample()
        }
    }
}
