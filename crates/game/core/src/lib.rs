//! Game rules and data types for the maze-escape simulation.
//!
//! `game-core` defines the canonical world model (fields, lands, the grid),
//! the maze generator, the dynamic entity ledger, the sight projection, the
//! adversary's pathfinding and the [`session::GameSession`] state machine.
//! Everything here is synchronous and deterministic for a given RNG; timers
//! are requested through [`session::Effects`] and driven by the runtime crate.
pub mod config;
pub mod enemy;
pub mod error;
pub mod field;
pub mod grid;
pub mod ledger;
pub mod maze;
pub mod session;
pub mod sight;

pub use config::{GameConfig, MapConfig, MapConfigError, RoomAnchor};
pub use enemy::{ChoicePolicy, EnemyAction, EnemyAgent, PathfindError, Pathfinder};
pub use error::{ErrorSeverity, GameError};
pub use field::{Field, KeyId, ScrapKind, ScrapSet};
pub use grid::{Coord, Direction, GridError, GridWorld, Land};
pub use ledger::{DepositOutcome, EntityLedger, Factory, Scrap};
pub use maze::{Maze, MazeError, MazeGenerator};
pub use session::{
    ClockState, Effects, GameOutcome, GameSession, GameView, Notification, Phase, PlayerState,
    SessionError, TimerKind, TimerRequest,
};
pub use sight::{SightProjector, SightWindow};
