use crate::enemy::PathfindError;
use crate::error::{ErrorSeverity, GameError};
use crate::grid::GridError;
use crate::maze::MazeError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Maze(#[from] MazeError),

    #[error(transparent)]
    Pathfind(#[from] PathfindError),

    #[error("no playable layout after {attempts} attempts: {reason}")]
    GenerationExhausted { attempts: u32, reason: String },
}

impl GameError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Grid(_) => ErrorSeverity::Internal,
            Self::Maze(error) => error.severity(),
            Self::Pathfind(error) => error.severity(),
            Self::GenerationExhausted { .. } => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Grid(error) => error.error_code(),
            Self::Maze(error) => error.error_code(),
            Self::Pathfind(error) => error.error_code(),
            Self::GenerationExhausted { .. } => "SESSION_GENERATION_EXHAUSTED",
        }
    }
}
