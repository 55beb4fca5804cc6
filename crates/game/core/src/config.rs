//! Rule constants and per-map configuration.
use std::time::Duration;

use crate::field::ScrapKind;

/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Chebyshev radius within which the adversary starts a direct chase.
    pub chase_radius: u32,
    /// Edge length of the player-centered sight window. Must be odd.
    pub sight_size: usize,
    /// How many layouts a new session may discard before giving up.
    pub generation_attempts: u32,
}

impl GameConfig {
    // ===== rule constants =====
    pub const MAX_HP: u8 = 5;
    pub const PLAYER_START: (i32, i32) = (1, 1);
    pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);
    pub const TRAP_COOLDOWN: Duration = Duration::from_millis(2000);

    // ===== terrain move delays (player) =====
    pub const LAND_DELAY: Duration = Duration::from_millis(100);
    pub const SCRAP_DELAY: Duration = Duration::from_millis(700);
    pub const BEAR_TRAP_DELAY: Duration = Duration::from_millis(1500);
    pub const BUSH_DELAY: Duration = Duration::from_millis(250);
    pub const PUDDLE_DELAY: Duration = Duration::from_millis(1800);

    // ===== adversary step intervals =====
    pub const ENEMY_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
    pub const ENEMY_PUDDLE_INTERVAL: Duration = Duration::from_millis(1200);
    pub const ENEMY_TRAP_INTERVAL: Duration = Duration::from_millis(2000);
    pub const ENEMY_BUSH_INTERVAL: Duration = Duration::from_millis(500);

    // ===== scrap respawn window: base + uniform jitter =====
    pub const RESPAWN_BASE_MS: u64 = 6000;
    pub const RESPAWN_JITTER_MS: u64 = 5000;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_CHASE_RADIUS: u32 = 6;
    pub const DEFAULT_SIGHT_SIZE: usize = 19;
    pub const DEFAULT_GENERATION_ATTEMPTS: u32 = 8;

    pub fn new() -> Self {
        Self {
            chase_radius: Self::DEFAULT_CHASE_RADIUS,
            sight_size: Self::DEFAULT_SIGHT_SIZE,
            generation_attempts: Self::DEFAULT_GENERATION_ATTEMPTS,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-left corner of a 5×5 room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomAnchor {
    pub x: i32,
    pub y: i32,
}

impl RoomAnchor {
    pub const SIZE: i32 = 5;

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Errors raised while validating a [`MapConfig`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MapConfigError {
    #[error("table size {size} is below the minimum of {min}")]
    TableTooSmall { size: usize, min: usize },
}

impl crate::error::GameError for MapConfigError {
    fn severity(&self) -> crate::error::ErrorSeverity {
        crate::error::ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TableTooSmall { .. } => "MAP_TABLE_TOO_SMALL",
        }
    }
}

/// Parameters of one map, as loaded from content files.
///
/// Counts are signed so that files may carry non-positive values; call
/// [`MapConfig::normalized`] to apply the defaults the game relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapConfig {
    pub difficulty: i32,
    pub table_size: usize,
    pub bear_traps: u32,
    pub bushes: u32,
    pub puddles: u32,
    pub factories: i32,
    pub heals: u32,
    pub bulbs: i32,
    pub foils: i32,
    pub gears: i32,
    pub pipes: i32,
    /// Adversary step interval on ordinary terrain, in milliseconds.
    pub enemy_speed_ms: u64,
    /// Collapse countdown, in seconds.
    pub end_game_time: i32,
    pub rooms: Vec<RoomAnchor>,
}

impl MapConfig {
    /// The sight window must fit inside the grid.
    pub const MIN_TABLE_SIZE: usize = GameConfig::DEFAULT_SIGHT_SIZE;
    pub const DEFAULT_END_GAME_TIME: i32 = 60;

    /// Applies the defaults for non-positive counts and durations.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.factories <= 0 {
            self.factories = 1;
        }
        for count in [
            &mut self.bulbs,
            &mut self.foils,
            &mut self.gears,
            &mut self.pipes,
        ] {
            if *count <= 0 {
                *count = 1;
            }
        }
        if self.end_game_time <= 0 {
            self.end_game_time = Self::DEFAULT_END_GAME_TIME;
        }
        if self.enemy_speed_ms == 0 {
            self.enemy_speed_ms = GameConfig::ENEMY_INITIAL_INTERVAL.as_millis() as u64;
        }
        self
    }

    pub fn validate(&self) -> Result<(), MapConfigError> {
        if self.table_size < Self::MIN_TABLE_SIZE {
            return Err(MapConfigError::TableTooSmall {
                size: self.table_size,
                min: Self::MIN_TABLE_SIZE,
            });
        }
        Ok(())
    }

    pub fn factory_count(&self) -> usize {
        self.factories.max(1) as usize
    }

    pub fn scrap_count(&self, kind: ScrapKind) -> usize {
        let count = match kind {
            ScrapKind::Bulb => self.bulbs,
            ScrapKind::Foil => self.foils,
            ScrapKind::Gear => self.gears,
            ScrapKind::Pipe => self.pipes,
        };
        count.max(1) as usize
    }

    /// Every scrap instance to place, grouped by kind in canonical order.
    pub fn scrap_instances(&self) -> Vec<ScrapKind> {
        ScrapKind::ALL
            .into_iter()
            .flat_map(|kind| std::iter::repeat_n(kind, self.scrap_count(kind)))
            .collect()
    }

    pub fn enemy_speed(&self) -> Duration {
        Duration::from_millis(self.enemy_speed_ms.max(1))
    }

    pub fn end_game_secs(&self) -> u32 {
        if self.end_game_time <= 0 {
            Self::DEFAULT_END_GAME_TIME as u32
        } else {
            self.end_game_time as u32
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            difficulty: 1,
            table_size: 19,
            bear_traps: 4,
            bushes: 10,
            puddles: 6,
            factories: 1,
            heals: 1,
            bulbs: 1,
            foils: 1,
            gears: 1,
            pipes: 1,
            enemy_speed_ms: 500,
            end_game_time: 120,
            rooms: vec![RoomAnchor::new(4, 7)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_applies_defaults() {
        let config = MapConfig {
            factories: 0,
            bulbs: -3,
            pipes: 0,
            end_game_time: 0,
            enemy_speed_ms: 0,
            ..MapConfig::default()
        }
        .normalized();

        assert_eq!(config.factories, 1);
        assert_eq!(config.bulbs, 1);
        assert_eq!(config.pipes, 1);
        assert_eq!(config.end_game_time, 60);
        assert_eq!(config.enemy_speed(), GameConfig::ENEMY_INITIAL_INTERVAL);
    }

    #[test]
    fn scrap_instances_expand_counts() {
        let config = MapConfig {
            gears: 2,
            ..MapConfig::default()
        };
        assert_eq!(
            config.scrap_instances(),
            vec![
                ScrapKind::Bulb,
                ScrapKind::Foil,
                ScrapKind::Gear,
                ScrapKind::Gear,
                ScrapKind::Pipe
            ]
        );
    }

    #[test]
    fn validate_rejects_small_tables() {
        let config = MapConfig {
            table_size: 11,
            ..MapConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(MapConfigError::TableTooSmall { size: 11, min: 19 })
        );
        assert!(MapConfig::default().validate().is_ok());
    }
}
