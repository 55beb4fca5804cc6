//! Dynamic per-coordinate entities layered on top of the grid.
//!
//! Factories keep their deposit state for the whole session. Scrap pickups
//! exist only while exploring and are dropped wholesale when the collapse
//! starts.
use std::collections::BTreeMap;

use crate::field::{ScrapKind, ScrapSet};
use crate::grid::Coord;

/// Result of handing scrap to a factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DepositOutcome {
    /// Kinds the factory took; the caller clears these from the player.
    pub accepted: ScrapSet,
    /// True only on the deposit that completed the factory.
    pub closed_now: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Factory {
    at: Coord,
    deposits: ScrapSet,
}

impl Factory {
    pub fn new(at: Coord) -> Self {
        Self {
            at,
            deposits: ScrapSet::empty(),
        }
    }

    pub fn at(&self) -> Coord {
        self.at
    }

    pub fn deposits(&self) -> ScrapSet {
        self.deposits
    }

    pub fn is_closed(&self) -> bool {
        self.deposits.is_all()
    }

    /// Takes every offered kind it is still missing.
    pub fn deposit(&mut self, offered: ScrapSet) -> DepositOutcome {
        let was_closed = self.is_closed();
        let accepted = offered.difference(self.deposits);
        self.deposits |= accepted;
        DepositOutcome {
            accepted,
            closed_now: !was_closed && self.is_closed(),
        }
    }

    /// Stocks every kind at once. Returns true when this closed the factory.
    pub fn fill(&mut self) -> bool {
        self.deposit(ScrapSet::all()).closed_now
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scrap {
    at: Coord,
    kind: ScrapKind,
    respawning: bool,
}

impl Scrap {
    pub fn new(at: Coord, kind: ScrapKind) -> Self {
        Self {
            at,
            kind,
            respawning: false,
        }
    }

    pub fn at(&self) -> Coord {
        self.at
    }

    pub fn kind(&self) -> ScrapKind {
        self.kind
    }

    /// True while a respawn timer is outstanding.
    pub fn is_respawning(&self) -> bool {
        self.respawning
    }

    pub fn set_respawning(&mut self, respawning: bool) {
        self.respawning = respawning;
    }
}

/// Coordinate-keyed registry of factories and scrap pickups.
///
/// Ordered maps keep iteration deterministic for a seeded session.
#[derive(Clone, Debug, Default)]
pub struct EntityLedger {
    factories: BTreeMap<Coord, Factory>,
    scraps: BTreeMap<Coord, Scrap>,
}

impl EntityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factory(&mut self, at: Coord) {
        self.factories.insert(at, Factory::new(at));
    }

    pub fn add_scrap(&mut self, at: Coord, kind: ScrapKind) {
        self.scraps.insert(at, Scrap::new(at, kind));
    }

    pub fn factory(&self, at: Coord) -> Option<&Factory> {
        self.factories.get(&at)
    }

    pub fn factory_mut(&mut self, at: Coord) -> Option<&mut Factory> {
        self.factories.get_mut(&at)
    }

    pub fn scrap(&self, at: Coord) -> Option<&Scrap> {
        self.scraps.get(&at)
    }

    pub fn scrap_mut(&mut self, at: Coord) -> Option<&mut Scrap> {
        self.scraps.get_mut(&at)
    }

    pub fn has_factory(&self, at: Coord) -> bool {
        self.factories.contains_key(&at)
    }

    pub fn has_scrap(&self, at: Coord) -> bool {
        self.scraps.contains_key(&at)
    }

    pub fn factories(&self) -> impl Iterator<Item = &Factory> {
        self.factories.values()
    }

    pub fn scraps(&self) -> impl Iterator<Item = &Scrap> {
        self.scraps.values()
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    pub fn scrap_count(&self) -> usize {
        self.scraps.len()
    }

    pub fn open_factory_count(&self) -> usize {
        self.factories().filter(|factory| !factory.is_closed()).count()
    }

    /// Vacuously false for a ledger without factories.
    pub fn all_factories_closed(&self) -> bool {
        !self.factories.is_empty() && self.factories().all(Factory::is_closed)
    }

    /// Fills every factory, returning the ones this closed.
    pub fn fill_factories(&mut self) -> Vec<Coord> {
        self.factories
            .values_mut()
            .filter_map(|factory| factory.fill().then_some(factory.at()))
            .collect()
    }

    /// Removes every scrap pickup, returning them in coordinate order.
    pub fn take_scraps(&mut self) -> Vec<Scrap> {
        std::mem::take(&mut self.scraps).into_values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.scraps.is_empty()
    }

    pub fn clear(&mut self) {
        self.factories.clear();
        self.scraps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_reports_closing_exactly_once() {
        let mut factory = Factory::new(Coord::new(3, 4));

        let first = factory.deposit(ScrapKind::Bulb.flag() | ScrapKind::Gear.flag());
        assert_eq!(first.accepted, ScrapSet::BULB | ScrapSet::GEAR);
        assert!(!first.closed_now);

        let second = factory.deposit(ScrapSet::BULB | ScrapSet::FOIL | ScrapSet::PIPE);
        assert_eq!(second.accepted, ScrapSet::FOIL | ScrapSet::PIPE);
        assert!(second.closed_now);
        assert!(factory.is_closed());

        let third = factory.deposit(ScrapSet::all());
        assert!(third.accepted.is_empty());
        assert!(!third.closed_now);
        assert!(!factory.fill());
    }

    #[test]
    fn ledger_tracks_open_factories() {
        let mut ledger = EntityLedger::new();
        assert!(!ledger.all_factories_closed());

        ledger.add_factory(Coord::new(5, 2));
        ledger.add_factory(Coord::new(9, 8));
        assert_eq!(ledger.open_factory_count(), 2);

        ledger.factory_mut(Coord::new(5, 2)).unwrap().fill();
        assert_eq!(ledger.open_factory_count(), 1);
        assert!(!ledger.all_factories_closed());

        assert_eq!(ledger.fill_factories(), vec![Coord::new(9, 8)]);
        assert!(ledger.all_factories_closed());
        assert!(ledger.fill_factories().is_empty());
    }

    #[test]
    fn take_scraps_drains_in_coordinate_order() {
        let mut ledger = EntityLedger::new();
        ledger.add_scrap(Coord::new(7, 1), ScrapKind::Pipe);
        ledger.add_scrap(Coord::new(1, 9), ScrapKind::Bulb);

        let taken = ledger.take_scraps();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].at(), Coord::new(1, 9));
        assert_eq!(taken[1].kind(), ScrapKind::Pipe);
        assert_eq!(ledger.scrap_count(), 0);
    }
}
