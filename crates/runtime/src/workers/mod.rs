//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the game session and executes commands one at
//! a time. Timers run as small tasks that only enqueue ticks back into the
//! same command channel, so a tick never races a command.

mod simulation;
mod timers;

pub use simulation::{Command, SimulationWorker};
pub(crate) use timers::TimerSet;
