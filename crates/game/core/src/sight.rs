//! Player-centered view of the grid.
use crate::config::GameConfig;
use crate::field::Field;
use crate::grid::{Coord, GridError, GridWorld};

/// Square snapshot of `current` values, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SightWindow {
    /// Grid coordinate of the top-left cell.
    pub origin: Coord,
    pub size: usize,
    pub cells: Vec<Field>,
}

impl SightWindow {
    /// Looks up a cell by window-local column and row.
    pub fn get(&self, column: i32, row: i32) -> Result<Field, GridError> {
        let size = self.size as i32;
        if column < 0 || row < 0 || column >= size || row >= size {
            return Err(GridError::InvalidCoordinate { x: column, y: row });
        }
        Ok(self.cells[row as usize * self.size + column as usize])
    }

    /// Looks up a cell by grid coordinate.
    pub fn at(&self, coord: Coord) -> Result<Field, GridError> {
        self.get(coord.x - self.origin.x, coord.y - self.origin.y)
            .map_err(|_| GridError::invalid(coord))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Field]> {
        self.cells.chunks(self.size.max(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SightProjector {
    size: usize,
}

impl SightProjector {
    pub const fn new(size: usize) -> Self {
        Self { size }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Shifts the window inward near the edges instead of shrinking it.
    pub fn project(&self, grid: &GridWorld, center: Coord) -> Result<SightWindow, GridError> {
        if !grid.contains(center) {
            return Err(GridError::invalid(center));
        }
        if grid.size() < self.size {
            return Err(GridError::WindowTooLarge {
                window: self.size,
                size: grid.size(),
            });
        }

        let half = (self.size / 2) as i32;
        let max_start = (grid.size() - self.size) as i32;
        let origin = Coord::new(
            (center.x - half).clamp(0, max_start),
            (center.y - half).clamp(0, max_start),
        );

        let mut cells = Vec::with_capacity(self.size * self.size);
        for row in 0..self.size as i32 {
            for column in 0..self.size as i32 {
                cells.push(grid.current(origin.offset(column, row))?);
            }
        }

        Ok(SightWindow {
            origin,
            size: self.size,
            cells,
        })
    }
}

impl Default for SightProjector {
    fn default() -> Self {
        Self::new(GameConfig::DEFAULT_SIGHT_SIZE)
    }
}
