//! Best-time leaderboard with file-backed and in-memory repositories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LeaderboardRepository, RepositoryError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: String,
    pub seconds: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Per-map result lists, each kept in ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    maps: BTreeMap<String, Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after any entry with the same time, so earlier runs rank first.
    pub fn add(&mut self, map: &str, entry: LeaderboardEntry) {
        let entries = self.maps.entry(map.to_owned()).or_default();
        let index = entries.partition_point(|existing| existing.seconds <= entry.seconds);
        entries.insert(index, entry);
    }

    pub fn entries(&self, map: &str) -> &[LeaderboardEntry] {
        self.maps.get(map).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn maps(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.maps.values().all(Vec::is_empty)
    }

    pub fn lines(&self) -> Vec<String> {
        self.maps
            .iter()
            .flat_map(|(map, entries)| {
                entries
                    .iter()
                    .map(move |entry| format!("{map} {} {} seconds", entry.player, entry.seconds))
            })
            .collect()
    }
}

fn entry_now(player: &str, seconds: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        player: player.to_owned(),
        seconds,
        recorded_at: Utc::now(),
    }
}

/// JSON file implementation of [`LeaderboardRepository`].
///
/// The whole table is held in memory; `save` rewrites the file through a
/// temporary file and an atomic rename.
pub struct FileLeaderboard {
    path: PathBuf,
    board: Leaderboard,
}

impl FileLeaderboard {
    /// Opens the leaderboard at `path`, starting empty if the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(RepositoryError::Io)?;
        }

        let board = if path.exists() {
            let json = fs::read_to_string(&path).map_err(RepositoryError::Io)?;
            let board: Leaderboard =
                serde_json::from_str(&json).map_err(|e| RepositoryError::Json(e.to_string()))?;
            tracing::info!(
                target: "runtime::repository",
                "Loaded leaderboard {} with {} maps",
                path.display(),
                board.maps().count()
            );
            board
        } else {
            Leaderboard::new()
        };

        Ok(Self { path, board })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LeaderboardRepository for FileLeaderboard {
    fn add_result(&mut self, map: &str, player: &str, seconds: u32) -> Result<()> {
        self.board.add(map, entry_now(player, seconds));
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&self.board)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;
        fs::write(&temp_path, json).map_err(RepositoryError::Io)?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(RepositoryError::Io)?;

        tracing::debug!(target: "runtime::repository", "Saved leaderboard: {}", self.path.display());
        Ok(())
    }

    fn entries(&self, map: &str) -> Result<Vec<LeaderboardEntry>> {
        Ok(self.board.entries(map).to_vec())
    }

    fn toplist(&self) -> Result<Vec<String>> {
        Ok(self.board.lines())
    }
}

/// In-memory leaderboard for testing and development.
///
/// `save` succeeds without persisting anything.
#[derive(Default)]
pub struct InMemoryLeaderboard {
    board: Leaderboard,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardRepository for InMemoryLeaderboard {
    fn add_result(&mut self, map: &str, player: &str, seconds: u32) -> Result<()> {
        self.board.add(map, entry_now(player, seconds));
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn entries(&self, map: &str) -> Result<Vec<LeaderboardEntry>> {
        Ok(self.board.entries(map).to_vec())
    }

    fn toplist(&self) -> Result<Vec<String>> {
        Ok(self.board.lines())
    }
}
