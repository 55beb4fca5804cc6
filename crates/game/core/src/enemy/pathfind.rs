//! Backtracking depth-first walk over the adversary's fog map.
//!
//! This is deliberately not a shortest-path search: it explores like a maze
//! walker, remembering dead ends, and only the branch choice differs between
//! pursuit modes.
use std::collections::HashSet;

use arrayvec::ArrayVec;
use rand::Rng;

use super::{FogMap, SCAN_ORDER};
use crate::error::{ErrorSeverity, GameError};
use crate::grid::Coord;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathfindError {
    /// Every branch out of the start was exhausted.
    #[error("no known route from {from} to {to}")]
    Unreachable { from: Coord, to: Coord },

    /// The walk tried to backtrack out of an empty path.
    #[error("pathfinder backtracked past the start")]
    BacktrackUnderflow,
}

impl GameError for PathfindError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Unreachable { .. } => ErrorSeverity::Recoverable,
            Self::BacktrackUnderflow => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "PATH_UNREACHABLE",
            Self::BacktrackUnderflow => "PATH_BACKTRACK_UNDERFLOW",
        }
    }
}

/// How to pick among several unvisited branches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChoicePolicy {
    /// Uniformly at random.
    Random,
    /// The first branch minimizing Manhattan distance to the destination.
    Greedy,
}

pub struct Pathfinder<'a> {
    fog: &'a FogMap,
    policy: ChoicePolicy,
}

impl<'a> Pathfinder<'a> {
    pub fn new(fog: &'a FogMap, policy: ChoicePolicy) -> Self {
        Self { fog, policy }
    }

    /// Walks from `start` until a cell adjacent to `destination` is reached.
    ///
    /// The result excludes `start` and is ordered for consumption from the
    /// tail: `last()` is the next step. With `include_destination` the
    /// destination itself is the first element.
    pub fn find<R: Rng + ?Sized>(
        &self,
        start: Coord,
        destination: Coord,
        include_destination: bool,
        rng: &mut R,
    ) -> Result<Vec<Coord>, PathfindError> {
        let mut path = vec![start];
        let mut dead_ends: HashSet<Coord> = HashSet::new();

        loop {
            let Some(&tip) = path.last() else {
                return Err(PathfindError::BacktrackUnderflow);
            };

            let mut arrived = false;
            let mut options: ArrayVec<Coord, 4> = ArrayVec::new();
            for direction in SCAN_ORDER {
                let next = tip.step(direction);
                let Some(field) = self.fog.get(next) else {
                    continue;
                };
                if field.is_walkable() && !dead_ends.contains(&next) {
                    options.push(next);
                }
                if next == destination {
                    arrived = true;
                }
            }
            if arrived {
                if include_destination {
                    path.push(destination);
                }
                break;
            }

            if let Some(&came_from) = path.len().checked_sub(2).and_then(|index| path.get(index)) {
                options.retain(|option| *option != came_from);
            }

            let next = match options.len() {
                0 => None,
                1 => (!path.contains(&options[0])).then_some(options[0]),
                _ => {
                    options.retain(|option| !path.contains(option));
                    self.choose(&options, destination, rng)
                }
            };

            match next {
                Some(next) => path.push(next),
                None if path.len() == 1 => {
                    return Err(PathfindError::Unreachable {
                        from: start,
                        to: destination,
                    });
                }
                None => {
                    dead_ends.insert(tip);
                    if path.pop().is_none() {
                        return Err(PathfindError::BacktrackUnderflow);
                    }
                }
            }
        }

        path.reverse();
        path.pop();
        Ok(path)
    }

    fn choose<R: Rng + ?Sized>(
        &self,
        options: &[Coord],
        destination: Coord,
        rng: &mut R,
    ) -> Option<Coord> {
        if options.is_empty() {
            return None;
        }
        match self.policy {
            ChoicePolicy::Random => Some(options[rng.gen_range(0..options.len())]),
            ChoicePolicy::Greedy => {
                let mut best = options[0];
                for option in &options[1..] {
                    if option.manhattan(destination) < best.manhattan(destination) {
                        best = *option;
                    }
                }
                Some(best)
            }
        }
    }
}
