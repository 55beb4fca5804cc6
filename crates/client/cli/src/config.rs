//! CLI configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use runtime::RuntimeConfig;

/// Configuration required to bootstrap the runtime and the driver.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub map_dir: PathBuf,
    /// Holds the leaderboard; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub session_id: Option<String>,
    pub player: String,
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            map_dir: PathBuf::from("maps"),
            data_dir: None,
            seed: None,
            session_id: None,
            player: "player".to_owned(),
            command_buffer: 32,
            event_buffer: 100,
        }
    }
}

impl CliConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MAZE_MAP_DIR` - Directory with `<map>.toml` files (default: `maps`)
    /// - `MAZE_DATA_DIR` - Directory for the leaderboard (default: platform-specific)
    /// - `MAZE_SEED` - Fixed RNG seed (default: entropy)
    /// - `MAZE_SESSION_ID` - Session identifier for log files (default: auto-generated)
    /// - `MAZE_PLAYER` - Name recorded on the leaderboard (default: `player`)
    /// - `MAZE_COMMAND_BUFFER` - Command queue size (default: 32)
    /// - `MAZE_EVENT_BUFFER` - Per-topic event capacity (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let parse = |key: &str| read(key).and_then(|value| value.trim().parse::<usize>().ok());

        let mut config = Self::default();
        if let Some(dir) = read("MAZE_MAP_DIR") {
            config.map_dir = PathBuf::from(dir);
        }
        config.data_dir = read("MAZE_DATA_DIR").map(PathBuf::from);
        config.seed = read("MAZE_SEED").and_then(|seed| seed.trim().parse().ok());
        config.session_id = read("MAZE_SESSION_ID");
        if let Some(player) = read("MAZE_PLAYER") {
            config.player = player.trim().to_owned();
        }
        if let Some(capacity) = parse("MAZE_COMMAND_BUFFER") {
            config.command_buffer = capacity.max(1);
        }
        if let Some(capacity) = parse("MAZE_EVENT_BUFFER") {
            config.event_buffer = capacity.max(1);
        }
        config
    }

    /// Leaderboard file inside the data directory.
    pub fn leaderboard_path(&self) -> PathBuf {
        let dir = self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "maze-escape")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("./save_data"))
        });
        dir.join("leaderboard.json")
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            map_dir: self.map_dir.clone(),
            leaderboard_path: Some(self.leaderboard_path()),
            seed: self.seed,
            event_buffer_size: self.event_buffer,
            command_buffer_size: self.command_buffer,
            ..RuntimeConfig::default()
        }
    }
}
