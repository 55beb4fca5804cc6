//! Repository contracts for map content and results.

use game_content::MapEntry;
use game_core::MapConfig;

use super::Result;
use super::leaderboard::LeaderboardEntry;

/// Source of map configurations.
///
/// This is STATIC data: maps are read, never written, by the runtime.
pub trait MapRepository: Send {
    /// Load a map by name with defaults applied.
    fn load(&self, name: &str) -> Result<MapConfig>;

    /// List every available map, easiest first.
    fn list(&self) -> Result<Vec<MapEntry>>;
}

/// Best-time table, grouped by map.
///
/// Results only change in memory until [`LeaderboardRepository::save`] is
/// called.
pub trait LeaderboardRepository: Send {
    /// Record a finished run. Entries for a map stay sorted by time.
    fn add_result(&mut self, map: &str, player: &str, seconds: u32) -> Result<()>;

    /// Persist the current table.
    fn save(&self) -> Result<()>;

    /// Entries for one map, fastest first.
    fn entries(&self, map: &str) -> Result<Vec<LeaderboardEntry>>;

    /// One `"<map> <player> <seconds> seconds"` line per entry.
    fn toplist(&self) -> Result<Vec<String>>;
}
