//! Data-driven map content.
//!
//! Map parameters live in TOML files, one per map, named `<map>.toml`:
//!
//! ```toml
//! difficulty = 2
//! table_size = 21
//! bear_traps = 4
//! bushes = 10
//! puddles = 6
//! factories = 2
//! heals = 2
//! bulbs = 1
//! foils = 1
//! gears = 2
//! pipes = 1
//! enemy_speed_ms = 450
//! end_game_time = 90
//!
//! [[rooms]]
//! x = 4
//! y = 7
//! ```
//!
//! Loaders return [`game_core::MapConfig`] with defaults applied; the runtime
//! consumes them when it starts a new game.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{LoadResult, MapEntry, MapLoader};
