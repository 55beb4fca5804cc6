//! Simulation worker that owns the authoritative [`GameSession`].
//!
//! Receives commands from [`crate::RuntimeHandle`] and ticks from the timer
//! tasks on one channel, applies them to the session in arrival order, and
//! publishes the resulting notifications to the [`EventBus`].

use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use game_content::MapEntry;
use game_core::{
    Effects, ErrorSeverity, GameConfig, GameError, GameSession, GameView, Notification, Phase,
    SessionError, TimerKind,
};

use super::TimerSet;
use crate::api::{Result, RuntimeError};
use crate::events::{Event, EventBus};
use crate::repository::{LeaderboardRepository, MapRepository};

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Load a map and build a new session, replacing any current one.
    /// The session is ready but not running until [`Command::StartGame`].
    NewGame {
        map: String,
        reply: oneshot::Sender<Result<GameView>>,
    },
    StartGame {
        reply: oneshot::Sender<Result<()>>,
    },
    Step {
        dx: i32,
        dy: i32,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Deposit scrap into the adjacent factory, or open the adjacent exit gate.
    HandleSpace {
        reply: oneshot::Sender<Result<()>>,
    },
    GetDataOfFactory {
        reply: oneshot::Sender<Result<()>>,
    },
    PauseAndContinue {
        reply: oneshot::Sender<Result<()>>,
    },
    FillFactories {
        reply: oneshot::Sender<Result<()>>,
    },
    /// Stop every timer and drop the session. Always succeeds.
    Dispose { reply: oneshot::Sender<()> },
    /// Current view, or `None` when no game exists.
    QueryView {
        reply: oneshot::Sender<Result<Option<GameView>>>,
    },
    ListMaps {
        reply: oneshot::Sender<Result<Vec<MapEntry>>>,
    },
    AddResult {
        map: String,
        player: String,
        seconds: u32,
        reply: oneshot::Sender<Result<()>>,
    },
    SaveToplist {
        reply: oneshot::Sender<Result<()>>,
    },
    GetToplist {
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    /// Sent by timer tasks, never by clients.
    Tick { kind: TimerKind, generation: u64 },
}

/// Background task that processes gameplay commands and timer ticks.
pub struct SimulationWorker {
    game_config: GameConfig,
    session: Option<GameSession>,
    map_name: Option<String>,
    rng: StdRng,
    maps: Box<dyn MapRepository>,
    leaderboard: Box<dyn LeaderboardRepository>,
    timers: TimerSet,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl SimulationWorker {
    /// Creates a new simulation worker.
    ///
    /// `ticks` must point at the sending side of `command_rx`.
    pub fn new(
        game_config: GameConfig,
        rng: StdRng,
        maps: Box<dyn MapRepository>,
        leaderboard: Box<dyn LeaderboardRepository>,
        command_rx: mpsc::Receiver<Command>,
        ticks: mpsc::WeakSender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            game_config,
            session: None,
            map_name: None,
            rng,
            maps,
            leaderboard,
            timers: TimerSet::new(ticks),
            command_rx,
            event_bus,
        }
    }

    /// Main worker loop. Ends once every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd);
                }
                else => break,
            }
        }
        self.dispose();
        debug!(target: "runtime::worker", "Simulation worker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::NewGame { map, reply } => {
                let result = self.new_game(map);
                respond(reply, result, "NewGame");
            }
            Command::StartGame { reply } => {
                let result = self.with_session(|session| Ok(session.start()));
                respond(reply, result, "StartGame");
            }
            Command::Step { dx, dy, reply } => {
                let result = self.with_session(|session| session.step(dx, dy));
                respond(reply, result, "Step");
            }
            Command::HandleSpace { reply } => {
                let result = self.with_session(GameSession::handle_space);
                respond(reply, result, "HandleSpace");
            }
            Command::GetDataOfFactory { reply } => {
                let result = self.with_session(|session| Ok(session.factory_data()));
                respond(reply, result, "GetDataOfFactory");
            }
            Command::PauseAndContinue { reply } => {
                let result = self.with_session(GameSession::toggle_pause);
                respond(reply, result, "PauseAndContinue");
            }
            Command::FillFactories { reply } => {
                let result = self.with_session(GameSession::fill_factories);
                respond(reply, result, "FillFactories");
            }
            Command::Dispose { reply } => {
                self.dispose();
                respond(reply, (), "Dispose");
            }
            Command::QueryView { reply } => {
                respond(reply, self.query_view(), "QueryView");
            }
            Command::ListMaps { reply } => {
                let result = self.maps.list().map_err(RuntimeError::DataAccess);
                respond(reply, result, "ListMaps");
            }
            Command::AddResult {
                map,
                player,
                seconds,
                reply,
            } => {
                let result = self
                    .leaderboard
                    .add_result(&map, &player, seconds)
                    .map_err(RuntimeError::from);
                respond(reply, result, "AddResult");
            }
            Command::SaveToplist { reply } => {
                let result = self.leaderboard.save().map_err(RuntimeError::from);
                respond(reply, result, "SaveToplist");
            }
            Command::GetToplist { reply } => {
                let result = self.leaderboard.toplist().map_err(RuntimeError::from);
                respond(reply, result, "GetToplist");
            }
            Command::Tick { kind, generation } => self.handle_tick(kind, generation),
        }
    }

    fn new_game(&mut self, map: String) -> Result<GameView> {
        let config = self.maps.load(&map).map_err(RuntimeError::DataAccess)?;
        self.dispose();

        let rng = StdRng::seed_from_u64(self.rng.next_u64());
        let (session, effects) = GameSession::new(config, self.game_config.clone(), rng)?;
        let view = session.view()?;

        info!(
            target: "runtime::worker",
            map = %map,
            size = session.grid().size(),
            factories = session.ledger().factory_count(),
            "New game created"
        );
        self.session = Some(session);
        self.map_name = Some(map);
        self.dispatch(effects);
        Ok(view)
    }

    fn query_view(&self) -> Result<Option<GameView>> {
        match &self.session {
            Some(session) if session.phase() != Phase::Disposed => Ok(Some(session.view()?)),
            _ => Ok(None),
        }
    }

    fn with_session(
        &mut self,
        command: impl FnOnce(&mut GameSession) -> std::result::Result<Effects, SessionError>,
    ) -> Result<()> {
        let session = self.session.as_mut().ok_or(RuntimeError::NoActiveGame)?;
        let outcome = command(session);
        self.apply(outcome)
    }

    fn handle_tick(&mut self, kind: TimerKind, generation: u64) {
        if !self.timers.accept(kind, generation) {
            trace!(target: "runtime::timers", ?kind, generation, "Dropped stale tick");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        trace!(target: "runtime::timers", ?kind, "Tick");

        let outcome = session.tick(kind);
        if let Err(error) = self.apply(outcome) {
            error!(target: "runtime::worker", ?kind, error = %error, "Tick failed");
        }
    }

    /// Dispatches effects, or tears the game down on a fatal error.
    fn apply(&mut self, outcome: std::result::Result<Effects, SessionError>) -> Result<()> {
        match outcome {
            Ok(effects) => {
                self.dispatch(effects);
                Ok(())
            }
            Err(error) if error.severity() == ErrorSeverity::Fatal => {
                error!(
                    target: "runtime::worker",
                    code = error.error_code(),
                    error = %error,
                    "Fatal game error; disposing the session"
                );
                self.dispose();
                self.event_bus.publish(Event::GameError {
                    message: error.to_string(),
                });
                Err(error.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn dispatch(&mut self, effects: Effects) {
        for request in effects.timers {
            self.timers.apply(request);
        }
        for notification in effects.notifications {
            match &notification {
                Notification::GameError(message) => {
                    warn!(target: "runtime::worker", message = %message, "Game error");
                }
                Notification::GameOver(outcome) => {
                    info!(
                        target: "runtime::worker",
                        map = self.map_name.as_deref().unwrap_or_default(),
                        won = outcome.is_won(),
                        elapsed = outcome.elapsed_seconds(),
                        "Game over"
                    );
                }
                _ => {}
            }
            self.event_bus.publish(Event::from(notification));
        }
    }

    fn dispose(&mut self) {
        if let Some(mut session) = self.session.take() {
            let effects = session.dispose();
            self.dispatch(effects);
            debug!(target: "runtime::worker", map = ?self.map_name, "Game disposed");
        }
        self.timers.cancel_all();
        self.map_name = None;
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T, command: &str) {
    if reply.send(value).is_err() {
        debug!(target: "runtime::worker", "{} reply channel closed (caller dropped)", command);
    }
}
