//! Procedural maze construction.
//!
//! Generation runs as a fixed sequence of passes over a wall-filled grid:
//! Kruskal carving of the odd sub-lattice, rooms, border smoothing and slot
//! selection, pickups, obstacles, factories and finally the exit gates.
mod carve;
mod place;

use rand::Rng;

use crate::config::{GameConfig, MapConfig, MapConfigError, RoomAnchor};
use crate::error::{ErrorSeverity, GameError};
use crate::field::Field;
use crate::grid::{Coord, GridError, GridWorld, Land};
use crate::ledger::EntityLedger;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error(transparent)]
    Config(#[from] MapConfigError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("{needed} scrap pickups need dead ends, only {available} found")]
    NotEnoughDeadEnds { needed: usize, available: usize },

    #[error("no wall slot left for a factory")]
    NoFactorySlot,

    #[error("exit gates need 4 border slots, only {available} found")]
    NotEnoughGateSlots { available: usize },
}

impl GameError for MazeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(_) => ErrorSeverity::Validation,
            Self::Grid(_) => ErrorSeverity::Internal,
            Self::NotEnoughDeadEnds { .. } | Self::NoFactorySlot | Self::NotEnoughGateSlots { .. } => {
                ErrorSeverity::Recoverable
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "MAZE_INVALID_CONFIG",
            Self::Grid(_) => "MAZE_GRID",
            Self::NotEnoughDeadEnds { .. } => "MAZE_NOT_ENOUGH_DEAD_ENDS",
            Self::NoFactorySlot => "MAZE_NO_FACTORY_SLOT",
            Self::NotEnoughGateSlots { .. } => "MAZE_NOT_ENOUGH_GATE_SLOTS",
        }
    }
}

/// A freshly generated world, ready to host a session.
#[derive(Clone, Debug)]
pub struct Maze {
    pub grid: GridWorld,
    pub ledger: EntityLedger,
    pub player: Coord,
}

pub struct MazeGenerator<'a, R: Rng> {
    config: &'a MapConfig,
    rng: &'a mut R,
    grid: GridWorld,
    ledger: EntityLedger,
    rooms: Vec<RoomAnchor>,
}

impl<'a, R: Rng> MazeGenerator<'a, R> {
    /// Builds one layout. Placement shortfalls are [`ErrorSeverity::Recoverable`]:
    /// another attempt with the same config may succeed.
    pub fn generate(config: &'a MapConfig, rng: &'a mut R) -> Result<Maze, MazeError> {
        config.validate()?;

        let size = config.table_size;
        let mut generator = Self {
            config,
            rng,
            grid: GridWorld::filled(size, Land::blocked(Field::Wall)),
            ledger: EntityLedger::new(),
            rooms: Vec::new(),
        };

        generator.carve_corridors()?;
        generator.carve_rooms()?;
        let slots = generator.smooth_and_pick_slots()?;
        generator.place_pickups()?;
        generator.place_obstacles()?;
        generator.place_factories(slots)?;
        generator.place_exit_gates()?;

        let (x, y) = GameConfig::PLAYER_START;
        let player = Coord::new(x, y);
        let mut start = Land::new(Field::FreeTile);
        start.current = Field::Player;
        generator.grid.replace(player, start)?;

        Ok(Maze {
            grid: generator.grid,
            ledger: generator.ledger,
            player,
        })
    }

    fn size(&self) -> i32 {
        self.grid.size() as i32
    }

    fn free_neighbours(&self, coord: Coord) -> usize {
        self.grid.count_base_neighbours(coord, Field::FreeTile)
    }

    fn wall_neighbours(&self, coord: Coord) -> usize {
        self.grid.count_base_neighbours(coord, Field::Wall)
    }

    /// Removes and returns a uniformly chosen element.
    fn take_random(&mut self, coords: &mut Vec<Coord>) -> Option<Coord> {
        if coords.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..coords.len());
        Some(coords.swap_remove(index))
    }
}
