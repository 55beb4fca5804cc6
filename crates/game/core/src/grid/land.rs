use std::time::Duration;

use crate::config::GameConfig;
use crate::field::Field;

/// One grid cell.
///
/// `base` is the terrain identity and survives occupants; `current` is what a
/// viewer sees right now. Pickups (heal, scrap, keys) and the player/enemy
/// overlays live on `current` only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Land {
    pub base: Field,
    pub current: Field,
    /// Blocks movement for both the player and the adversary.
    pub occupied: bool,
    /// Step cooldown a player incurs when entering this cell.
    pub move_delay: Duration,
}

impl Land {
    pub const fn new(field: Field) -> Self {
        Self::with_delay(field, GameConfig::LAND_DELAY)
    }

    pub const fn with_delay(field: Field, move_delay: Duration) -> Self {
        Self {
            base: field,
            current: field,
            occupied: false,
            move_delay,
        }
    }

    pub const fn blocked(field: Field) -> Self {
        Self {
            occupied: true,
            ..Self::new(field)
        }
    }

    /// Pickup lying on a free tile.
    pub const fn item(field: Field, move_delay: Duration) -> Self {
        Self {
            base: Field::FreeTile,
            current: field,
            occupied: false,
            move_delay,
        }
    }

    pub fn restore(&mut self) {
        self.current = self.base;
    }

    /// Sets base and current together.
    pub fn change(&mut self, field: Field, occupied: bool) {
        self.base = field;
        self.current = field;
        self.occupied = occupied;
    }
}

impl Default for Land {
    fn default() -> Self {
        Self::new(Field::FreeTile)
    }
}
