//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up the command channel and
//! the event bus, and exposes a builder-based API for clients to drive games.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use game_core::GameConfig;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::EventBus;
use crate::repository::{
    FileLeaderboard, FileMapRepository, InMemoryLeaderboard, LeaderboardRepository, MapRepository,
};
use crate::workers::{Command, SimulationWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub game_config: GameConfig,
    /// Directory holding `<map>.toml` files.
    pub map_dir: PathBuf,
    /// JSON leaderboard file. Results stay in memory when unset.
    pub leaderboard_path: Option<PathBuf>,
    /// Fixed seed for reproducible games; entropy when unset.
    pub seed: Option<u64>,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game_config: GameConfig::default(),
            map_dir: PathBuf::from("maps"),
            leaderboard_path: None,
            seed: None,
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

/// Main runtime that orchestrates game simulation
///
/// Runtime owns the worker task; [`RuntimeHandle`] provides a cloneable
/// façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Build a runtime from `config` with file-backed repositories.
    pub async fn start(config: RuntimeConfig) -> Result<Self> {
        Self::builder().config(config).build().await
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Shutdown the runtime gracefully
    ///
    /// The current game is disposed first. The worker stops once every
    /// outstanding handle clone has been dropped.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.dispose().await?;
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    maps: Option<Box<dyn MapRepository>>,
    leaderboard: Option<Box<dyn LeaderboardRepository>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            maps: None,
            leaderboard: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `maps` instead of reading `config.map_dir`.
    pub fn maps(mut self, maps: impl MapRepository + 'static) -> Self {
        self.maps = Some(Box::new(maps));
        self
    }

    /// Use `leaderboard` instead of `config.leaderboard_path`.
    pub fn leaderboard(mut self, leaderboard: impl LeaderboardRepository + 'static) -> Self {
        self.leaderboard = Some(Box::new(leaderboard));
        self
    }

    /// Build the runtime and spawn its worker.
    pub async fn build(self) -> Result<Runtime> {
        let config = self.config;

        let maps = match self.maps {
            Some(maps) => maps,
            None => Box::new(FileMapRepository::new(&config.map_dir)),
        };
        let leaderboard = match (self.leaderboard, &config.leaderboard_path) {
            (Some(leaderboard), _) => leaderboard,
            (None, Some(path)) => Box::new(FileLeaderboard::open(path)?),
            (None, None) => Box::new(InMemoryLeaderboard::new()),
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(config.command_buffer_size.max(1));
        let event_bus = EventBus::with_capacity(config.event_buffer_size);

        let sim_worker = SimulationWorker::new(
            config.game_config.clone(),
            rng,
            maps,
            leaderboard,
            command_rx,
            command_tx.downgrade(),
            event_bus.clone(),
        );
        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        tracing::debug!(
            target: "runtime::worker",
            map_dir = %config.map_dir.display(),
            seeded = config.seed.is_some(),
            "Runtime started"
        );

        Ok(Runtime {
            handle: RuntimeHandle::new(command_tx, event_bus),
            sim_worker_handle,
        })
    }
}
