//! Repository layer for data the runtime reads or records.
//!
//! - Map configurations (static, loaded through `game-content`)
//! - The leaderboard of finished runs (mutable, persisted on request)

mod error;
mod leaderboard;
mod map;
mod traits;

pub use error::{RepositoryError, Result};
pub use leaderboard::{FileLeaderboard, InMemoryLeaderboard, Leaderboard, LeaderboardEntry};
pub use map::{FileMapRepository, InMemoryMapRepository};
pub use traits::{LeaderboardRepository, MapRepository};
