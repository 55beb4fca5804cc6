//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! every game command, map and leaderboard query, and event subscription.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use game_content::MapEntry;
use game_core::GameView;

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Load `map` and build a new game, replacing the current one.
    ///
    /// The game is ready but its clocks do not run until [`Self::start_game`].
    pub async fn new_game(&self, map: impl Into<String>) -> Result<GameView> {
        let map = map.into();
        self.request(|reply| Command::NewGame { map, reply }).await?
    }

    /// Start the game clock and the adversary.
    pub async fn start_game(&self) -> Result<()> {
        self.request(|reply| Command::StartGame { reply }).await?
    }

    /// Move the player by one cell. Illegal moves are silently ignored.
    pub async fn step(&self, dx: i32, dy: i32) -> Result<()> {
        self.request(|reply| Command::Step { dx, dy, reply }).await?
    }

    /// Deposit scrap into the adjacent factory, or open the adjacent exit gate
    /// once every factory is closed.
    pub async fn handle_space(&self) -> Result<()> {
        self.request(|reply| Command::HandleSpace { reply }).await?
    }

    /// Ask for the deposits of the adjacent factory. The answer is published
    /// as [`Event::FactoryInformation`] on [`Topic::Factory`].
    pub async fn get_data_of_factory(&self) -> Result<()> {
        self.request(|reply| Command::GetDataOfFactory { reply }).await?
    }

    /// Pause a running game, or resume a paused one.
    pub async fn pause_and_continue(&self) -> Result<()> {
        self.request(|reply| Command::PauseAndContinue { reply }).await?
    }

    /// Close every factory at once.
    pub async fn fill_factories(&self) -> Result<()> {
        self.request(|reply| Command::FillFactories { reply }).await?
    }

    /// Stop all timers and drop the current game. Safe to call repeatedly.
    pub async fn dispose(&self) -> Result<()> {
        self.request(|reply| Command::Dispose { reply }).await
    }

    /// Query the current view (read-only snapshot)
    pub async fn query_view(&self) -> Result<Option<GameView>> {
        self.request(|reply| Command::QueryView { reply }).await?
    }

    pub async fn list_maps(&self) -> Result<Vec<MapEntry>> {
        self.request(|reply| Command::ListMaps { reply }).await?
    }

    pub async fn add_result(
        &self,
        map: impl Into<String>,
        player: impl Into<String>,
        seconds: u32,
    ) -> Result<()> {
        let (map, player) = (map.into(), player.into());
        self.request(|reply| Command::AddResult {
            map,
            player,
            seconds,
            reply,
        })
        .await?
    }

    pub async fn save_toplist(&self) -> Result<()> {
        self.request(|reply| Command::SaveToplist { reply }).await?
    }

    pub async fn get_toplist(&self) -> Result<Vec<String>> {
        self.request(|reply| Command::GetToplist { reply }).await?
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Game` - Game created, advanced and over
    /// - `Topic::Factory` - Factory reports and closings
    /// - `Topic::Diagnostics` - Non-fatal game errors
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::{Event, Topic};
    ///
    /// let mut game_rx = handle.subscribe(Topic::Game);
    /// while let Ok(event) = game_rx.recv().await {
    ///     if let Event::GameOver { won, .. } = event {
    ///         break;
    ///     }
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
