//! Headless driver that plays a game through the [`RuntimeHandle`].
//!
//! The autopilot wanders the maze from the latest sight window, grabbing
//! whatever it steps on and pressing space next to factories and gates. It
//! is a smoke test for the runtime more than a strategy.
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use game_core::{Direction, Field, GameView};
use runtime::{Event, RuntimeHandle, Topic};

const STEP_INTERVAL: Duration = Duration::from_millis(200);

/// How a driven game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finish {
    pub won: bool,
    pub elapsed_seconds: i64,
}

/// Cells the player can enter. Bear traps are avoided when possible.
fn passable(field: Field) -> bool {
    field.is_walkable() || field.is_pickup()
}

/// Whether the player stands next to something space interacts with.
fn next_to_interactable(view: &GameView) -> bool {
    Direction::ALL.into_iter().any(|direction| {
        view.sight
            .at(view.player.step(direction))
            .is_ok_and(|field| field == Field::OpenFactory || field.is_exit_gate())
    })
}

/// Picks the next move, preferring safe cells and not turning back.
pub fn choose_direction(
    view: &GameView,
    previous: Option<Direction>,
    rng: &mut impl Rng,
) -> Option<Direction> {
    let open: Vec<(Direction, Field)> = Direction::ALL
        .into_iter()
        .filter_map(|direction| {
            let field = view.sight.at(view.player.step(direction)).ok()?;
            passable(field).then_some((direction, field))
        })
        .collect();

    let back = previous.map(Direction::opposite);
    let safe_forward: Vec<Direction> = open
        .iter()
        .filter(|(direction, field)| *field != Field::BearTrap && Some(*direction) != back)
        .map(|(direction, _)| *direction)
        .collect();
    if !safe_forward.is_empty() {
        return pick(&safe_forward, rng);
    }
    // Dead end: turn back, and only walk into a trap when nothing else is left.
    let safe: Vec<Direction> = open
        .iter()
        .filter(|(_, field)| *field != Field::BearTrap)
        .map(|(direction, _)| *direction)
        .collect();
    if !safe.is_empty() {
        return pick(&safe, rng);
    }
    let any: Vec<Direction> = open.into_iter().map(|(direction, _)| direction).collect();
    pick(&any, rng)
}

fn pick(candidates: &[Direction], rng: &mut impl Rng) -> Option<Direction> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

/// Drives the current game until it ends or the runtime goes away.
pub async fn drive(handle: &RuntimeHandle, mut rng: StdRng) -> Result<Option<Finish>> {
    let mut receivers = handle.subscribe_multiple(&Topic::ALL);
    let mut game_rx = receivers
        .remove(&Topic::Game)
        .ok_or_else(|| anyhow::anyhow!("game topic missing"))?;
    let mut factory_rx = receivers
        .remove(&Topic::Factory)
        .ok_or_else(|| anyhow::anyhow!("factory topic missing"))?;
    let mut diagnostics_rx = receivers
        .remove(&Topic::Diagnostics)
        .ok_or_else(|| anyhow::anyhow!("diagnostics topic missing"))?;

    let mut ticker = tokio::time::interval(STEP_INTERVAL);
    let mut previous = None;

    loop {
        tokio::select! {
            event = game_rx.recv() => match event {
                Ok(Event::GameOver { won, elapsed_seconds }) => {
                    info!(won, elapsed_seconds, "Game over");
                    return Ok(Some(Finish { won, elapsed_seconds }));
                }
                Ok(Event::GameAdvanced(view)) => {
                    debug!(
                        player = %view.player,
                        hp = view.hp,
                        time = view.game_time,
                        time_left = ?view.time_left,
                        "Game advanced"
                    );
                }
                Ok(event) => debug!(?event, "Game event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Game events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            },
            Ok(event) = factory_rx.recv() => match event {
                Event::FactoryClosed { at } => info!(%at, "Factory closed"),
                Event::FactoryInformation(report) => info!(?report, "Factory deposits"),
                _ => {}
            },
            Ok(event) = diagnostics_rx.recv() => {
                if let Event::GameError { message } = event {
                    warn!(%message, "Game error");
                }
            }
            _ = ticker.tick() => {
                let Some(view) = handle.query_view().await? else {
                    return Ok(None);
                };
                if !view.running || view.paused {
                    continue;
                }
                if next_to_interactable(&view) {
                    handle.get_data_of_factory().await?;
                    handle.handle_space().await?;
                }
                if let Some(direction) = choose_direction(&view, previous, &mut rng) {
                    let (dx, dy) = direction.delta();
                    handle.step(dx, dy).await?;
                    previous = Some(direction);
                }
            }
        }
    }
}
