//! Corridor, room and border passes.
use rand::Rng;

use super::{MazeError, MazeGenerator};
use crate::config::RoomAnchor;
use crate::field::Field;
use crate::grid::Coord;

/// Union-find over flat cell indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[b] = a;
        }
    }
}

impl<R: Rng> MazeGenerator<'_, R> {
    /// Randomized Kruskal over the odd sub-lattice.
    ///
    /// Lattice cells stop short of the last row and column so even sizes keep
    /// a closed border.
    pub(super) fn carve_corridors(&mut self) -> Result<(), MazeError> {
        let size = self.size();
        let index = |coord: Coord| (coord.y * size + coord.x) as usize;
        let mut sets = DisjointSet::new((size * size) as usize);
        let mut walls = Vec::new();

        for coord in self.grid.coords() {
            let on_lattice =
                coord.x % 2 == 1 && coord.y % 2 == 1 && coord.x < size - 1 && coord.y < size - 1;
            if on_lattice {
                self.grid.change_land(coord, Field::FreeTile, false)?;
            } else {
                walls.push(coord);
            }
        }

        while let Some(wall) = self.take_random(&mut walls) {
            let open: Vec<Coord> = self
                .grid
                .neighbours(wall)
                .into_iter()
                .filter(|neighbour| self.grid.base_is(*neighbour, Field::FreeTile))
                .collect();
            if open.len() < 2 {
                continue;
            }

            let first = sets.find(index(open[0]));
            let joins_sets = open[1..]
                .iter()
                .any(|neighbour| sets.find(index(*neighbour)) != first);
            if !joins_sets {
                continue;
            }

            for neighbour in &open[1..] {
                sets.union(first, index(*neighbour));
            }
            sets.union(first, index(wall));
            self.grid.change_land(wall, Field::FreeTile, false)?;
        }
        Ok(())
    }

    /// Opens a 5×5 block per anchor that fits inside the border.
    pub(super) fn carve_rooms(&mut self) -> Result<(), MazeError> {
        let size = self.size();
        let config = self.config;
        for &room in &config.rooms {
            let RoomAnchor { x, y } = room;
            let fits = x >= 1 && y >= 1 && x + RoomAnchor::SIZE < size && y + RoomAnchor::SIZE < size;
            if !fits {
                continue;
            }

            for dy in 0..RoomAnchor::SIZE {
                for dx in 0..RoomAnchor::SIZE {
                    self.grid
                        .change_land(Coord::new(x + dx, y + dy), Field::FreeTile, false)?;
                }
            }

            let bushes: [(i32, i32); 3] = match self.rng.gen_range(0..4) {
                0 => [(0, 0), (1, 0), (0, 1)],
                1 => [(4, 0), (3, 0), (4, 1)],
                2 => [(4, 4), (3, 4), (4, 3)],
                _ => [(0, 4), (0, 3), (1, 4)],
            };
            for (dx, dy) in bushes {
                self.grid
                    .change_land(Coord::new(x + dx, y + dy), Field::Bush, false)?;
            }

            let boxes: [(i32, i32); 3] = if self.rng.gen_range(0..2) == 0 {
                [(2, 1), (3, 1), (3, 2)]
            } else {
                [(1, 2), (1, 3), (2, 3)]
            };
            for (dx, dy) in boxes {
                self.grid
                    .change_land(Coord::new(x + dx, y + dy), Field::Box, true)?;
            }

            // (corner, outer side, outer side, outer diagonal)
            let corners = [
                ((0, 0), (-1, 0), (0, -1), (-1, -1)),
                ((4, 0), (5, 0), (4, -1), (5, -1)),
                ((4, 4), (5, 4), (4, 5), (5, 5)),
                ((0, 4), (-1, 4), (0, 5), (-1, 5)),
            ];
            for (corner, side_a, side_b, diagonal) in corners {
                let at = |(dx, dy): (i32, i32)| Coord::new(x + dx, y + dy);
                if self.grid.base_is(at(side_a), Field::Wall)
                    && self.grid.base_is(at(side_b), Field::Wall)
                    && !self.grid.base_is(at(diagonal), Field::Wall)
                {
                    self.grid.change_land(at(corner), Field::Wall, true)?;
                }
            }

            self.rooms.push(room);
        }
        Ok(())
    }

    /// Opens the inner ring, picks factory slots and re-seals wall nubs.
    ///
    /// Slots are straight corridor walls whose two flanking walls are
    /// themselves corridor walls. Every 6–14th such wall is carved open
    /// instead of becoming a slot.
    pub(super) fn smooth_and_pick_slots(&mut self) -> Result<Vec<Coord>, MazeError> {
        let size = self.size();

        for i in 1..size - 1 {
            for coord in [
                Coord::new(i, 1),
                Coord::new(1, i),
                Coord::new(i, size - 2),
                Coord::new(size - 2, i),
            ] {
                self.grid.change_land(coord, Field::FreeTile, false)?;
            }
        }

        let mut slots = Vec::new();
        let mut countdown: i32 = self.rng.gen_range(8..14);
        for x in 0..size {
            for y in 0..size {
                let wall = Coord::new(x, y);
                if !self.grid.base_is(wall, Field::Wall) || self.free_neighbours(wall) != 2 {
                    continue;
                }
                if !self.is_corridor_wall(wall) {
                    continue;
                }

                countdown -= 1;
                if countdown <= 0 {
                    self.grid.change_land(wall, Field::FreeTile, false)?;
                    countdown = self.rng.gen_range(6..14);
                } else {
                    slots.push(wall);
                }
            }
        }

        // (probe, repair). Only the first two edges probe their own edge;
        // the west and east edges are gated on the north probe.
        let mut nubs = Vec::new();
        for i in 2..size - 2 {
            let north = Coord::new(i, 2);
            if self.grid.base_is(north, Field::Wall) {
                nubs.push((north, Coord::new(i, 1)));
            }
            let south = Coord::new(i, size - 3);
            if self.grid.base_is(south, Field::Wall) {
                nubs.push((south, Coord::new(i, size - 2)));
            }
            if self.grid.base_is(north, Field::Wall) {
                nubs.push((Coord::new(2, i), Coord::new(1, i)));
            }
            if self.grid.base_is(north, Field::Wall) {
                nubs.push((Coord::new(size - 3, i), Coord::new(size - 2, i)));
            }
        }
        for (probe, repair) in nubs {
            if self.free_neighbours(probe) == 4 {
                self.grid.change_land(repair, Field::Wall, true)?;
            }
        }

        Ok(slots)
    }

    fn is_corridor_wall(&self, wall: Coord) -> bool {
        let size = self.size();
        let free = |coord: Coord| self.grid.base_is(coord, Field::FreeTile);

        if free(wall.offset(-1, 0)) && free(wall.offset(1, 0)) {
            wall.y - 1 > 0
                && wall.y + 1 < size - 1
                && self.free_neighbours(wall.offset(0, -1)) == 2
                && self.free_neighbours(wall.offset(0, 1)) == 2
        } else if free(wall.offset(0, -1)) && free(wall.offset(0, 1)) {
            wall.x - 1 > 0
                && wall.x + 1 < size - 1
                && self.free_neighbours(wall.offset(-1, 0)) == 2
                && self.free_neighbours(wall.offset(1, 0)) == 2
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::MapConfig;
    use crate::grid::{GridWorld, Land};
    use crate::ledger::EntityLedger;

    fn generator<'a>(config: &'a MapConfig, rng: &'a mut StdRng) -> MazeGenerator<'a, StdRng> {
        MazeGenerator {
            config,
            rng,
            grid: GridWorld::filled(config.table_size, Land::blocked(Field::Wall)),
            ledger: EntityLedger::new(),
            rooms: Vec::new(),
        }
    }

    #[test]
    fn kruskal_yields_a_spanning_tree() {
        let config = MapConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut maze = generator(&config, &mut rng);
        maze.carve_corridors().unwrap();

        let open: Vec<Coord> = maze
            .grid
            .coords()
            .filter(|c| maze.grid.base_is(*c, Field::FreeTile))
            .collect();
        let mut seen = vec![Coord::new(1, 1)];
        let mut frontier = vec![Coord::new(1, 1)];
        while let Some(at) = frontier.pop() {
            for next in maze.grid.neighbours(at) {
                if maze.grid.base_is(next, Field::FreeTile) && !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        assert_eq!(seen.len(), open.len());
        // Each carve merges at least two sets, so at most L - 1 walls open.
        let lattice = 9 * 9;
        assert!(open.len() <= lattice + lattice - 1);
        assert!(maze.grid.coords().filter(|c| maze.grid.is_border(*c)).all(|c| {
            maze.grid.base_is(c, Field::Wall)
        }));
    }

    #[test]
    fn even_sizes_keep_a_closed_border() {
        let config = MapConfig {
            table_size: 20,
            ..MapConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut maze = generator(&config, &mut rng);
        maze.carve_corridors().unwrap();
        for y in 0..20 {
            assert!(maze.grid.base_is(Coord::new(19, y), Field::Wall));
        }
    }

    #[test]
    fn rooms_carve_bushes_and_boxes() {
        let config = MapConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut maze = generator(&config, &mut rng);
        maze.carve_corridors().unwrap();
        maze.carve_rooms().unwrap();

        assert_eq!(maze.rooms, vec![RoomAnchor::new(4, 7)]);
        assert_eq!(maze.grid.count_current(|field| field == Field::Box), 3);
        assert!(maze.grid.count_current(|field| field == Field::Bush) <= 3);
        assert!(maze.grid.base_is(Coord::new(6, 9), Field::FreeTile));
    }

    #[test]
    fn inner_ring_is_open_after_smoothing() {
        let config = MapConfig {
            rooms: Vec::new(),
            ..MapConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut maze = generator(&config, &mut rng);
        maze.carve_corridors().unwrap();
        let slots = maze.smooth_and_pick_slots().unwrap();

        assert!(!slots.is_empty());
        for slot in &slots {
            assert!(maze.grid.base_is(*slot, Field::Wall));
        }
        // Row 1 is only re-walled in front of a wall nub on row 2.
        for i in 1..18 {
            if maze.grid.base_is(Coord::new(i, 1), Field::Wall) {
                assert!(maze.grid.base_is(Coord::new(i, 2), Field::Wall));
            }
        }
    }
}
