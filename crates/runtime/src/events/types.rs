//! Events published by the simulation worker.

use serde::{Deserialize, Serialize};

use game_core::{Coord, GameView, Notification, ScrapKind, ScrapSet};

use super::Topic;

/// Which scrap kinds a factory has received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactoryReport {
    pub bulb: bool,
    pub foil: bool,
    pub gear: bool,
    pub pipe: bool,
}

impl From<ScrapSet> for FactoryReport {
    fn from(deposits: ScrapSet) -> Self {
        Self {
            bulb: deposits.has(ScrapKind::Bulb),
            foil: deposits.has(ScrapKind::Foil),
            gear: deposits.has(ScrapKind::Gear),
            pipe: deposits.has(ScrapKind::Pipe),
        }
    }
}

/// Event wrapper carrying one outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    GameCreated(GameView),
    GameAdvanced(GameView),
    FactoryInformation(FactoryReport),
    FactoryClosed { at: Coord },
    /// `elapsed_seconds` is `-1` when the game was lost.
    GameOver { won: bool, elapsed_seconds: i64 },
    GameError { message: String },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::GameCreated(_) | Event::GameAdvanced(_) | Event::GameOver { .. } => Topic::Game,
            Event::FactoryInformation(_) | Event::FactoryClosed { .. } => Topic::Factory,
            Event::GameError { .. } => Topic::Diagnostics,
        }
    }
}

impl From<Notification> for Event {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::GameCreated(view) => Event::GameCreated(view),
            Notification::GameAdvanced(view) => Event::GameAdvanced(view),
            Notification::FactoryInformation(deposits) => Event::FactoryInformation(deposits.into()),
            Notification::FactoryClosed { at } => Event::FactoryClosed { at },
            Notification::GameOver(outcome) => Event::GameOver {
                won: outcome.is_won(),
                elapsed_seconds: outcome.elapsed_seconds(),
            },
            Notification::GameError(message) => Event::GameError { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use game_core::GameOutcome;

    use super::*;

    #[test]
    fn game_over_carries_elapsed_seconds() {
        let won = Event::from(Notification::GameOver(GameOutcome::Won { elapsed_secs: 42 }));
        assert_eq!(
            won,
            Event::GameOver {
                won: true,
                elapsed_seconds: 42
            }
        );
        assert_eq!(won.topic(), Topic::Game);

        let lost = Event::from(Notification::GameOver(GameOutcome::Lost));
        assert_eq!(
            lost,
            Event::GameOver {
                won: false,
                elapsed_seconds: -1
            }
        );
    }

    #[test]
    fn factory_information_spells_out_each_kind() {
        let deposits = ScrapKind::Bulb.flag() | ScrapKind::Pipe.flag();
        let event = Event::from(Notification::FactoryInformation(deposits));
        assert_eq!(
            event,
            Event::FactoryInformation(FactoryReport {
                bulb: true,
                foil: false,
                gear: false,
                pipe: true,
            })
        );
        assert_eq!(event.topic(), Topic::Factory);
    }
}
