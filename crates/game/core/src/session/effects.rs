//! Side effects a session asks its driver to carry out.
//!
//! The session never owns a clock. Every command and tick returns an
//! [`Effects`] value listing the notifications to publish and the timers to
//! arm or cancel; the runtime applies them in order.
use std::time::Duration;

use crate::field::ScrapSet;
use crate::grid::Coord;

use super::{GameOutcome, GameView};

/// Identity of a timer. At most one timer per kind is armed at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerKind {
    /// Counts elapsed game seconds.
    GameClock,
    /// Collapse countdown; only armed while collapsing.
    Countdown,
    /// Re-enables player input after a step.
    StepCooldown,
    /// Drives the adversary.
    EnemyClock,
    /// Brings back the scrap pickup at this cell.
    Respawn(Coord),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerRequest {
    /// Fires every `period`; replaces an armed timer of the same kind.
    Repeat { kind: TimerKind, period: Duration },
    /// Fires once after `delay`; replaces an armed timer of the same kind.
    Once { kind: TimerKind, delay: Duration },
    Cancel(TimerKind),
    CancelAll,
}

impl TimerRequest {
    pub fn kind(&self) -> Option<TimerKind> {
        match self {
            Self::Repeat { kind, .. } | Self::Once { kind, .. } => Some(*kind),
            Self::Cancel(kind) => Some(*kind),
            Self::CancelAll => None,
        }
    }
}

/// Outbound events of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Notification {
    GameCreated(GameView),
    GameAdvanced(GameView),
    /// Deposit flags of the factory next to the player.
    FactoryInformation(ScrapSet),
    FactoryClosed { at: Coord },
    GameOver(GameOutcome),
    /// Non-fatal problem worth surfacing to the player.
    GameError(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub notifications: Vec<Notification>,
    pub timers: Vec<TimerRequest>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.timers.is_empty()
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::GameError(message.into()));
    }

    pub(crate) fn timer(&mut self, request: TimerRequest) {
        self.timers.push(request);
    }

    pub(crate) fn repeat(&mut self, kind: TimerKind, period: Duration) {
        self.timer(TimerRequest::Repeat { kind, period });
    }

    pub(crate) fn once(&mut self, kind: TimerKind, delay: Duration) {
        self.timer(TimerRequest::Once { kind, delay });
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        self.timer(TimerRequest::Cancel(kind));
    }

    /// Last outcome announced in these effects, if any.
    pub fn game_over(&self) -> Option<GameOutcome> {
        self.notifications.iter().rev().find_map(|notification| match notification {
            Notification::GameOver(outcome) => Some(*outcome),
            _ => None,
        })
    }

    /// Most recent view carried by a created/advanced notification.
    pub fn latest_view(&self) -> Option<&GameView> {
        self.notifications.iter().rev().find_map(|notification| match notification {
            Notification::GameCreated(view) | Notification::GameAdvanced(view) => Some(view),
            _ => None,
        })
    }
}
