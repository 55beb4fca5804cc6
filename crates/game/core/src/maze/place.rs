//! Placement passes: pickups, obstacles, factories and exit gates.
use std::time::Duration;

use rand::Rng;

use super::{MazeError, MazeGenerator};
use crate::config::GameConfig;
use crate::field::{Field, KeyId};
use crate::grid::{Coord, Land};

impl<R: Rng> MazeGenerator<'_, R> {
    /// Heals go to room centers; scrap and the remaining heals go to dead ends.
    pub(super) fn place_pickups(&mut self) -> Result<(), MazeError> {
        for room in self.rooms.clone() {
            self.grid
                .set_current(Coord::new(room.x + 2, room.y + 2), Field::Heal)?;
        }

        let size = self.size();
        let start = Coord::from(GameConfig::PLAYER_START);
        let mut dead_ends: Vec<Coord> = Vec::new();
        for x in 0..size - 1 {
            for y in 0..size - 1 {
                let coord = Coord::new(x, y);
                if coord != start
                    && self.grid.base_is(coord, Field::FreeTile)
                    && self.wall_neighbours(coord) == 3
                {
                    dead_ends.push(coord);
                }
            }
        }

        let scraps = self.config.scrap_instances();
        if dead_ends.len() < scraps.len() {
            return Err(MazeError::NotEnoughDeadEnds {
                needed: scraps.len(),
                available: dead_ends.len(),
            });
        }
        for kind in scraps {
            if let Some(at) = self.take_random(&mut dead_ends) {
                self.grid
                    .replace(at, Land::item(Field::Scrap(kind), GameConfig::SCRAP_DELAY))?;
                self.ledger.add_scrap(at, kind);
            }
        }

        let mut heals = self.config.heals;
        while heals > 0 {
            let Some(at) = self.take_random(&mut dead_ends) else {
                break;
            };
            self.grid.set_current(at, Field::Heal)?;
            heals -= 1;
        }
        Ok(())
    }

    pub(super) fn place_obstacles(&mut self) -> Result<(), MazeError> {
        let size = self.size();
        let mut candidates = self.obstacle_candidates(3..size - 4);

        let plan = [
            (Field::BearTrap, self.config.bear_traps, GameConfig::BEAR_TRAP_DELAY),
            (Field::Bush, self.config.bushes, GameConfig::BUSH_DELAY),
            (Field::Puddle, self.config.puddles, GameConfig::PUDDLE_DELAY),
        ];
        for (obstacle, count, delay) in plan {
            for _ in 0..count {
                if !self.place_obstacle(&mut candidates, obstacle, delay)? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns false when not a single free cell is left anywhere.
    fn place_obstacle(
        &mut self,
        candidates: &mut Vec<Coord>,
        obstacle: Field,
        delay: Duration,
    ) -> Result<bool, MazeError> {
        if candidates.is_empty() {
            *candidates = self.obstacle_candidates(1..self.size() - 1);
        }
        let Some(at) = self.take_random(candidates) else {
            return Ok(false);
        };

        self.grid.replace(at, Land::with_delay(obstacle, delay))?;
        let spread = [at.offset(1, 0), at.offset(-1, 0), at.offset(0, 1), at.offset(0, -1)];
        candidates.retain(|coord| !spread.contains(coord));
        Ok(true)
    }

    /// Free cells with at most two wall neighbours, never the player start.
    fn obstacle_candidates(&self, span: std::ops::Range<i32>) -> Vec<Coord> {
        let start = Coord::from(GameConfig::PLAYER_START);
        let mut candidates = Vec::new();
        for x in span.clone() {
            for y in span.clone() {
                let coord = Coord::new(x, y);
                if coord != start
                    && self.grid.current_is(coord, Field::FreeTile)
                    && self.wall_neighbours(coord) <= 2
                {
                    candidates.push(coord);
                }
            }
        }
        candidates
    }

    /// Places up to the configured number of factories, at least one.
    pub(super) fn place_factories(&mut self, mut slots: Vec<Coord>) -> Result<(), MazeError> {
        for _ in 0..self.config.factory_count() {
            let Some(at) = self.take_random(&mut slots) else {
                break;
            };
            slots.retain(|slot| slot.x.abs_diff(at.x) > 2 || slot.y.abs_diff(at.y) > 2);

            self.grid.change_land(at, Field::OpenFactory, true)?;
            self.ledger.add_factory(at);
        }

        if self.ledger.factory_count() == 0 {
            return Err(MazeError::NoFactorySlot);
        }
        Ok(())
    }

    /// Gates sit on the border every fifth cell, in front of an open tile.
    pub(super) fn place_exit_gates(&mut self) -> Result<(), MazeError> {
        let size = self.size();
        let mut slots = Vec::new();
        for i in (4..size - 4).filter(|i| i % 5 == 1) {
            let pairs = [
                (Coord::new(0, i), Coord::new(1, i)),
                (Coord::new(i, 0), Coord::new(i, 1)),
                (Coord::new(size - 1, i), Coord::new(size - 2, i)),
                (Coord::new(i, size - 1), Coord::new(i, size - 2)),
            ];
            for (gate, inner) in pairs {
                if self.grid.base_is(inner, Field::FreeTile) {
                    slots.push(gate);
                }
            }
        }

        if slots.len() < KeyId::ALL.len() {
            return Err(MazeError::NotEnoughGateSlots {
                available: slots.len(),
            });
        }
        for key in KeyId::ALL {
            if let Some(at) = self.take_random(&mut slots) {
                self.grid.change_land(at, Field::ExitGate(key), true)?;
            }
        }
        Ok(())
    }
}
