//! Timer tasks keyed by [`TimerKind`].
//!
//! Each armed timer is one tokio task that sleeps and then sends
//! [`Command::Tick`] to the simulation worker. A timer of a kind replaces any
//! armed timer of the same kind. Every arm gets a fresh generation number so
//! ticks from a replaced or cancelled timer that were already queued are
//! recognized and dropped.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

use game_core::{TimerKind, TimerRequest};

use super::Command;

struct Armed {
    generation: u64,
    repeating: bool,
    task: JoinHandle<()>,
}

pub(crate) struct TimerSet {
    // Weak so armed timers never keep the command channel open.
    ticks: mpsc::WeakSender<Command>,
    armed: HashMap<TimerKind, Armed>,
    next_generation: u64,
}

impl TimerSet {
    pub(crate) fn new(ticks: mpsc::WeakSender<Command>) -> Self {
        Self {
            ticks,
            armed: HashMap::new(),
            next_generation: 0,
        }
    }

    pub(crate) fn apply(&mut self, request: TimerRequest) {
        match request {
            TimerRequest::Repeat { kind, period } => self.arm(kind, period, true),
            TimerRequest::Once { kind, delay } => self.arm(kind, delay, false),
            TimerRequest::Cancel(kind) => self.cancel(kind),
            TimerRequest::CancelAll => self.cancel_all(),
        }
    }

    fn arm(&mut self, kind: TimerKind, period: Duration, repeating: bool) {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;
        let ticks = self.ticks.clone();

        let task = tokio::spawn(async move {
            if repeating {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if !send_tick(&ticks, kind, generation).await {
                        break;
                    }
                }
            } else {
                tokio::time::sleep(period).await;
                send_tick(&ticks, kind, generation).await;
            }
        });

        trace!(target: "runtime::timers", ?kind, ?period, repeating, generation, "Armed timer");
        self.armed.insert(
            kind,
            Armed {
                generation,
                repeating,
                task,
            },
        );
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        if let Some(armed) = self.armed.remove(&kind) {
            armed.task.abort();
            trace!(target: "runtime::timers", ?kind, "Cancelled timer");
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.task.abort();
        }
    }

    /// Returns true when the tick comes from the timer currently armed for
    /// `kind`. A one-shot timer is forgotten once its tick is accepted.
    pub(crate) fn accept(&mut self, kind: TimerKind, generation: u64) -> bool {
        let Some(armed) = self.armed.get(&kind) else {
            return false;
        };
        if armed.generation != generation {
            return false;
        }
        if !armed.repeating {
            self.armed.remove(&kind);
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.armed.len()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn send_tick(ticks: &mpsc::WeakSender<Command>, kind: TimerKind, generation: u64) -> bool {
    let Some(sender) = ticks.upgrade() else {
        return false;
    };
    sender.send(Command::Tick { kind, generation }).await.is_ok()
}
