//! The N×N world grid.
mod coord;
mod land;

pub use coord::{Coord, Direction};
pub use land::Land;

use arrayvec::ArrayVec;

use crate::error::{ErrorSeverity, GameError};
use crate::field::Field;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("coordinate ({x}, {y}) is outside the grid")]
    InvalidCoordinate { x: i32, y: i32 },

    #[error("window of {window} cells does not fit a grid of {size}")]
    WindowTooLarge { window: usize, size: usize },
}

impl GridError {
    pub fn invalid(coord: Coord) -> Self {
        Self::InvalidCoordinate {
            x: coord.x,
            y: coord.y,
        }
    }
}

impl GameError for GridError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinate { .. } => "GRID_INVALID_COORDINATE",
            Self::WindowTooLarge { .. } => "GRID_WINDOW_TOO_LARGE",
        }
    }
}

/// Square matrix of [`Land`], stored row-major (`y * size + x`).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GridWorld {
    size: usize,
    cells: Vec<Land>,
}

impl GridWorld {
    pub fn new(size: usize) -> Self {
        Self::filled(size, Land::default())
    }

    pub fn filled(size: usize, land: Land) -> Self {
        Self {
            size,
            cells: vec![land; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        let size = self.size as i32;
        coord.x >= 0 && coord.y >= 0 && coord.x < size && coord.y < size
    }

    pub fn is_border(&self, coord: Coord) -> bool {
        let last = self.size as i32 - 1;
        self.contains(coord) && (coord.x == 0 || coord.y == 0 || coord.x == last || coord.y == last)
    }

    fn index(&self, coord: Coord) -> Result<usize, GridError> {
        if self.contains(coord) {
            Ok(coord.y as usize * self.size + coord.x as usize)
        } else {
            Err(GridError::invalid(coord))
        }
    }

    pub fn get(&self, coord: Coord) -> Option<&Land> {
        self.index(coord).ok().map(|index| &self.cells[index])
    }

    pub fn land(&self, coord: Coord) -> Result<&Land, GridError> {
        let index = self.index(coord)?;
        Ok(&self.cells[index])
    }

    pub fn land_mut(&mut self, coord: Coord) -> Result<&mut Land, GridError> {
        let index = self.index(coord)?;
        Ok(&mut self.cells[index])
    }

    pub fn current(&self, coord: Coord) -> Result<Field, GridError> {
        self.land(coord).map(|land| land.current)
    }

    pub fn base(&self, coord: Coord) -> Result<Field, GridError> {
        self.land(coord).map(|land| land.base)
    }

    pub fn set_current(&mut self, coord: Coord, field: Field) -> Result<(), GridError> {
        self.land_mut(coord)?.current = field;
        Ok(())
    }

    pub fn set_base(&mut self, coord: Coord, field: Field) -> Result<(), GridError> {
        self.land_mut(coord)?.base = field;
        Ok(())
    }

    /// Replaces the terrain of a cell: base and current become `field`.
    pub fn change_land(&mut self, coord: Coord, field: Field, occupied: bool) -> Result<(), GridError> {
        self.land_mut(coord)?.change(field, occupied);
        Ok(())
    }

    pub fn replace(&mut self, coord: Coord, land: Land) -> Result<(), GridError> {
        *self.land_mut(coord)? = land;
        Ok(())
    }

    /// Out-of-range coordinates never match.
    pub fn base_is(&self, coord: Coord, field: Field) -> bool {
        self.get(coord).is_some_and(|land| land.base == field)
    }

    /// Out-of-range coordinates never match.
    pub fn current_is(&self, coord: Coord, field: Field) -> bool {
        self.get(coord).is_some_and(|land| land.current == field)
    }

    /// In-bounds orthogonal neighbours, in [`Direction::ALL`] order.
    pub fn neighbours(&self, coord: Coord) -> ArrayVec<Coord, 4> {
        Direction::ALL
            .into_iter()
            .map(|direction| coord.step(direction))
            .filter(|neighbour| self.contains(*neighbour))
            .collect()
    }

    /// Counts the orthogonal neighbours whose base value is `field`.
    pub fn count_base_neighbours(&self, coord: Coord, field: Field) -> usize {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.base_is(coord.step(*direction), field))
            .count()
    }

    /// Every coordinate, row-major.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let size = self.size as i32;
        (0..size).flat_map(move |y| (0..size).map(move |x| Coord::new(x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Land)> {
        self.coords().zip(self.cells.iter())
    }

    pub fn find_base(&self, field: Field) -> Option<Coord> {
        self.iter()
            .find(|(_, land)| land.base == field)
            .map(|(coord, _)| coord)
    }

    pub fn count_current(&self, predicate: impl Fn(Field) -> bool) -> usize {
        self.cells
            .iter()
            .filter(|land| predicate(land.current))
            .count()
    }

    pub fn clear(&mut self) {
        self.size = 0;
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_access_is_an_error() {
        let grid = GridWorld::new(5);
        assert_eq!(
            grid.current(Coord::new(5, 0)),
            Err(GridError::InvalidCoordinate { x: 5, y: 0 })
        );
        assert_eq!(
            grid.base(Coord::new(0, -1)),
            Err(GridError::InvalidCoordinate { x: 0, y: -1 })
        );
        assert!(!grid.base_is(Coord::new(-1, 2), Field::FreeTile));
    }

    #[test]
    fn storage_is_row_major() {
        let mut grid = GridWorld::new(4);
        grid.change_land(Coord::new(3, 1), Field::Wall, true).unwrap();

        let (coord, land) = grid.iter().nth(7).unwrap();
        assert_eq!(coord, Coord::new(3, 1));
        assert_eq!(land.base, Field::Wall);
        assert!(land.occupied);
        assert_eq!(grid.find_base(Field::Wall), Some(Coord::new(3, 1)));
    }

    #[test]
    fn neighbours_skip_the_outside() {
        let grid = GridWorld::new(3);
        let corner: Vec<_> = grid.neighbours(Coord::ORIGIN).into_iter().collect();
        assert_eq!(corner, vec![Coord::new(1, 0), Coord::new(0, 1)]);
        assert_eq!(grid.neighbours(Coord::new(1, 1)).len(), 4);
        assert!(grid.is_border(Coord::new(2, 1)));
        assert!(!grid.is_border(Coord::new(1, 1)));
    }

    #[test]
    fn current_overlay_restores_to_base() {
        let mut grid = GridWorld::new(3);
        let at = Coord::new(1, 1);
        grid.change_land(at, Field::Bush, false).unwrap();
        grid.set_current(at, Field::HiddenPlayer).unwrap();
        assert_eq!(grid.base(at), Ok(Field::Bush));

        grid.land_mut(at).unwrap().restore();
        assert_eq!(grid.current(at), Ok(Field::Bush));
    }

    #[test]
    fn clear_empties_the_grid() {
        let mut grid = GridWorld::new(3);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.size(), 0);
        assert!(!grid.contains(Coord::ORIGIN));
    }

    #[test]
    fn direction_accepts_unit_vectors_only() {
        assert_eq!(Direction::from_delta(0, -1), Some(Direction::Up));
        assert_eq!(Direction::from_delta(1, 1), None);
        assert_eq!(Direction::from_delta(2, 0), None);
        assert_eq!(Direction::from_delta(0, 0), None);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }
}
