//! Runtime orchestration for the real-time maze game.
//!
//! This crate wires a [`game_core::GameSession`] to tokio: one worker task
//! owns the session and serializes client commands with timer ticks, an event
//! bus fans notifications out by topic, and repositories provide maps and the
//! leaderboard. Consumers embed [`Runtime`] and talk to it through
//! [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`repository`] provides map and leaderboard adapters
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod repository;
pub mod runtime;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use events::{Event, EventBus, FactoryReport, Topic};
pub use repository::{
    FileLeaderboard, FileMapRepository, InMemoryLeaderboard, InMemoryMapRepository, Leaderboard,
    LeaderboardEntry, LeaderboardRepository, MapRepository, RepositoryError,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
