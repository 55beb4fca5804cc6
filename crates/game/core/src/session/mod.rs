//! The game state machine.
//!
//! A [`GameSession`] owns the grid, the entity ledger, the adversary and the
//! player. Commands and timer ticks mutate it synchronously and return
//! [`Effects`]: notifications to publish and timers to arm or cancel. The
//! session is `Exploring` until every factory is closed, `Collapsing` while
//! the exit gates are powered, and frozen in `Finished` once the game is won
//! or lost.
mod effects;
mod error;
mod player;

pub use effects::{Effects, Notification, TimerKind, TimerRequest};
pub use error::SessionError;
pub use player::PlayerState;

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::{GameConfig, MapConfig};
use crate::enemy::{EnemyAction, EnemyAgent, PursuitContext};
use crate::error::GameError;
use crate::field::{Field, KeyId, ScrapSet};
use crate::grid::{Coord, Direction, GridWorld, Land};
use crate::ledger::EntityLedger;
use crate::maze::{Maze, MazeGenerator};
use crate::sight::{SightProjector, SightWindow};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameOutcome {
    Won { elapsed_secs: u32 },
    Lost,
}

impl GameOutcome {
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Won { .. })
    }

    /// Seconds reported to listeners; `-1` for a loss.
    pub fn elapsed_seconds(&self) -> i64 {
        match self {
            Self::Won { elapsed_secs } => i64::from(*elapsed_secs),
            Self::Lost => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    Exploring,
    /// Every factory is closed and the exit gates are powered.
    Collapsing,
    Finished(GameOutcome),
    Disposed,
}

impl Phase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Exploring | Self::Collapsing)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockState {
    /// Set by [`GameSession::start`], cleared when the game ends.
    pub running: bool,
    pub paused: bool,
    pub game_time: u32,
    /// Seconds until the collapse ends the game; `None` while exploring.
    pub time_left: Option<u32>,
}

/// Everything a front end needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameView {
    pub sight: SightWindow,
    pub player: Coord,
    pub hp: u8,
    pub max_hp: u8,
    pub scraps: ScrapSet,
    pub key: Option<KeyId>,
    pub hidden: bool,
    pub game_time: u32,
    pub time_left: Option<u32>,
    pub gates_powered: bool,
    pub factories_left: usize,
    pub phase: Phase,
    pub running: bool,
    pub paused: bool,
}

pub struct GameSession {
    config: GameConfig,
    map: MapConfig,
    rng: StdRng,
    grid: GridWorld,
    ledger: EntityLedger,
    enemy: EnemyAgent,
    player: PlayerState,
    phase: Phase,
    clock: ClockState,
    gates_powered: bool,
}

impl GameSession {
    /// Generates a world for `map` and returns a session that is ready but
    /// not yet running, along with its `GameCreated` notification.
    ///
    /// Layouts that cannot host every pickup, gate or the adversary are
    /// discarded and regenerated, up to `config.generation_attempts` times.
    pub fn new(
        map: MapConfig,
        config: GameConfig,
        mut rng: StdRng,
    ) -> Result<(Self, Effects), SessionError> {
        let attempts = config.generation_attempts.max(1);
        let mut reason = String::new();

        for _ in 0..attempts {
            let mut maze = match MazeGenerator::generate(&map, &mut rng) {
                Ok(maze) => maze,
                Err(error) if error.severity().is_recoverable() => {
                    reason = error.to_string();
                    continue;
                }
                Err(error) => return Err(error.into()),
            };
            let Some(enemy) = EnemyAgent::spawn(&mut maze.grid, &mut rng) else {
                reason = "no free cell near the center for the adversary".to_owned();
                continue;
            };

            let session = Self::assemble(maze, enemy, map, config, rng);
            let mut effects = Effects::new();
            effects.notify(Notification::GameCreated(session.view()?));
            return Ok((session, effects));
        }

        Err(SessionError::GenerationExhausted { attempts, reason })
    }

    fn assemble(
        maze: Maze,
        enemy: EnemyAgent,
        map: MapConfig,
        config: GameConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            config,
            map,
            rng,
            grid: maze.grid,
            ledger: maze.ledger,
            enemy,
            player: PlayerState::new(maze.player),
            phase: Phase::Exploring,
            clock: ClockState::default(),
            gates_powered: false,
        }
    }

    // ===== accessors =====

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn grid(&self) -> &GridWorld {
        &self.grid
    }

    pub fn ledger(&self) -> &EntityLedger {
        &self.ledger
    }

    pub fn enemy(&self) -> &EnemyAgent {
        &self.enemy
    }

    pub fn map(&self) -> &MapConfig {
        &self.map
    }

    pub fn gates_powered(&self) -> bool {
        self.gates_powered
    }

    pub fn view(&self) -> Result<GameView, SessionError> {
        let sight = SightProjector::new(self.config.sight_size)
            .project(&self.grid, self.player.position)?;
        Ok(GameView {
            sight,
            player: self.player.position,
            hp: self.player.hp,
            max_hp: GameConfig::MAX_HP,
            scraps: self.player.scraps,
            key: self.player.key,
            hidden: self.player.hidden,
            game_time: self.clock.game_time,
            time_left: self.clock.time_left,
            gates_powered: self.gates_powered,
            factories_left: self.ledger.open_factory_count(),
            phase: self.phase,
            running: self.clock.running,
            paused: self.clock.paused,
        })
    }

    fn accepts_input(&self) -> bool {
        self.phase.is_active() && self.clock.running && !self.clock.paused
    }

    fn advanced(&self, effects: &mut Effects) -> Result<(), SessionError> {
        effects.notify(Notification::GameAdvanced(self.view()?));
        Ok(())
    }

    // ===== commands =====

    /// Starts the game clock and the adversary.
    pub fn start(&mut self) -> Effects {
        let mut effects = Effects::new();
        if !self.phase.is_active() || self.clock.running {
            return effects;
        }
        self.clock.running = true;
        self.clock.paused = false;
        effects.repeat(TimerKind::GameClock, GameConfig::CLOCK_PERIOD);
        effects.repeat(TimerKind::EnemyClock, self.enemy.interval());
        effects
    }

    /// Moves the player one cell. Anything but a legal unit step is ignored.
    pub fn step(&mut self, dx: i32, dy: i32) -> Result<Effects, SessionError> {
        let mut effects = Effects::new();
        if !self.accepts_input() || !self.player.can_step {
            return Ok(effects);
        }
        let Some(direction) = Direction::from_delta(dx, dy) else {
            return Ok(effects);
        };
        let to = self.player.position.step(direction);
        let Some(target) = self.grid.get(to).copied() else {
            return Ok(effects);
        };
        if target.occupied {
            return Ok(effects);
        }

        let mut cooldown = target.move_delay;
        let moved = match target.current {
            Field::FreeTile | Field::Bush | Field::Puddle => {
                self.move_player(to, target.current)?;
                true
            }
            Field::BearTrap => {
                self.grid.replace(to, Land::new(Field::FreeTile))?;
                self.move_player(to, Field::BearTrap)?;
                self.player.wound();
                cooldown = GameConfig::TRAP_COOLDOWN;
                true
            }
            Field::Heal if self.player.is_wounded() => {
                self.move_player(to, Field::Heal)?;
                self.player.heal();
                true
            }
            Field::Scrap(kind) if !self.player.holds(kind) => {
                self.move_player(to, target.current)?;
                self.player.scraps.insert(kind.flag());
                self.arm_respawn(to, &mut effects);
                true
            }
            Field::Key(key) => {
                self.move_player(to, target.current)?;
                let previous = self.player.key.replace(key);
                self.grid
                    .set_base(to, previous.map_or(Field::FreeTile, Field::Key))?;
                true
            }
            _ => false,
        };

        if !self.player.is_alive() {
            self.finish(GameOutcome::Lost, &mut effects)?;
        } else if moved {
            self.player.can_step = false;
            effects.once(TimerKind::StepCooldown, cooldown);
            self.advanced(&mut effects)?;
        }
        Ok(effects)
    }

    fn move_player(&mut self, to: Coord, terrain: Field) -> Result<(), SessionError> {
        let left = self.grid.land_mut(self.player.position)?;
        left.restore();
        // A scrap that respawned underfoot stays behind as a pickup.
        if left.base.is_scrap() {
            left.base = Field::FreeTile;
        }

        let (overlay, hidden) = PlayerState::overlay_on(terrain);
        self.grid.set_current(to, overlay)?;
        self.player.position = to;
        self.player.hidden = hidden;
        Ok(())
    }

    fn arm_respawn(&mut self, at: Coord, effects: &mut Effects) {
        if let Some(scrap) = self.ledger.scrap_mut(at) {
            scrap.set_respawning(true);
            let jitter = self.rng.gen_range(0..GameConfig::RESPAWN_JITTER_MS);
            effects.once(
                TimerKind::Respawn(at),
                Duration::from_millis(GameConfig::RESPAWN_BASE_MS + jitter),
            );
        }
    }

    /// Deposits scrap while exploring; opens an exit gate once powered.
    pub fn handle_space(&mut self) -> Result<Effects, SessionError> {
        let mut effects = Effects::new();
        if !self.accepts_input() {
            return Ok(effects);
        }
        if self.gates_powered {
            self.open_exit(&mut effects)?;
        } else {
            self.deposit(&mut effects)?;
        }
        Ok(effects)
    }

    fn deposit(&mut self, effects: &mut Effects) -> Result<(), SessionError> {
        if self.player.scraps.is_empty() {
            return Ok(());
        }
        let Some(at) = self.adjacent_factory() else {
            return Ok(());
        };
        let Some(factory) = self.ledger.factory_mut(at) else {
            return Ok(());
        };

        let outcome = factory.deposit(self.player.scraps);
        self.player.scraps.remove(outcome.accepted);
        if outcome.closed_now {
            self.close_factory(at, effects)?;
            if self.ledger.all_factories_closed() {
                self.collapse(effects)?;
            }
        }
        self.advanced(effects)
    }

    fn close_factory(&mut self, at: Coord, effects: &mut Effects) -> Result<(), SessionError> {
        self.grid.change_land(at, Field::ClosedFactory, true)?;
        self.enemy.forget_factory(at);
        effects.notify(Notification::FactoryClosed { at });
        Ok(())
    }

    /// Open factory next to the player; the last match in probe order wins.
    fn adjacent_factory(&self) -> Option<Coord> {
        if self.gates_powered {
            return None;
        }
        Direction::ALL
            .into_iter()
            .map(|direction| self.player.position.step(direction))
            .filter(|at| {
                self.grid.current_is(*at, Field::OpenFactory) && self.ledger.has_factory(*at)
            })
            .last()
    }

    fn open_exit(&mut self, effects: &mut Effects) -> Result<(), SessionError> {
        let gate = Direction::ALL
            .into_iter()
            .filter_map(|direction| self.grid.get(self.player.position.step(direction)))
            .filter_map(|land| land.current.gate())
            .last();

        if gate.is_some() && gate == self.player.key {
            let elapsed_secs = self.clock.game_time;
            self.finish(GameOutcome::Won { elapsed_secs }, effects)?;
        }
        Ok(())
    }

    /// Reports the deposit flags of the adjacent open factory.
    pub fn factory_data(&self) -> Effects {
        let mut effects = Effects::new();
        let factory = self
            .adjacent_factory()
            .and_then(|at| self.ledger.factory(at));
        if let Some(factory) = factory {
            effects.notify(Notification::FactoryInformation(factory.deposits()));
        }
        effects
    }

    /// Stops or resumes the game clock and the adversary together.
    pub fn toggle_pause(&mut self) -> Result<Effects, SessionError> {
        let mut effects = Effects::new();
        if !self.phase.is_active() || !self.clock.running {
            return Ok(effects);
        }

        self.clock.paused = !self.clock.paused;
        if self.clock.paused {
            effects.cancel(TimerKind::GameClock);
            effects.cancel(TimerKind::EnemyClock);
        } else {
            effects.repeat(TimerKind::GameClock, GameConfig::CLOCK_PERIOD);
            effects.repeat(TimerKind::EnemyClock, self.enemy.interval());
        }
        self.advanced(&mut effects)?;
        Ok(effects)
    }

    /// Closes every factory at once, starts the collapse and hands the
    /// player the first key.
    pub fn fill_factories(&mut self) -> Result<Effects, SessionError> {
        let mut effects = Effects::new();
        if !self.phase.is_active() || !self.clock.running || self.gates_powered {
            return Ok(effects);
        }

        for at in self.ledger.fill_factories() {
            self.close_factory(at, &mut effects)?;
        }
        self.collapse(&mut effects)?;

        self.player.key = Some(KeyId::One);
        for at in self.grid.coords() {
            let land = self.grid.land_mut(at)?;
            // A key under the adversary sits on the base.
            if land.base == Field::Key(KeyId::One) {
                land.base = Field::FreeTile;
            }
            if land.current == Field::Key(KeyId::One) {
                land.restore();
            }
        }
        self.advanced(&mut effects)?;
        Ok(effects)
    }

    fn collapse(&mut self, effects: &mut Effects) -> Result<(), SessionError> {
        if self.gates_powered {
            return Ok(());
        }

        let mut cells = Vec::new();
        for scrap in self.ledger.take_scraps() {
            let at = scrap.at();
            if scrap.is_respawning() {
                effects.cancel(TimerKind::Respawn(at));
            }
            let occupant = self.grid.current(at)?;
            self.grid.replace(at, Land::new(Field::FreeTile))?;
            if at == self.player.position {
                self.grid.set_current(at, Field::Player)?;
            } else if occupant.is_enemy() {
                self.grid.set_current(at, occupant)?;
            }
            cells.push(at);
        }

        for key in KeyId::ALL {
            if cells.is_empty() {
                effects.error(format!("no free cell left to place key {key}"));
                continue;
            }
            let at = cells.swap_remove(self.rng.gen_range(0..cells.len()));
            if at == self.player.position {
                if self.player.key.is_none() {
                    self.player.key = Some(key);
                } else {
                    self.grid.set_base(at, Field::Key(key))?;
                }
            } else if self.grid.current(at)?.is_enemy() {
                self.grid.set_base(at, Field::Key(key))?;
            } else {
                self.grid.set_current(at, Field::Key(key))?;
            }
        }

        self.enemy.reveal(&self.grid, self.player.position);
        self.gates_powered = true;
        self.phase = Phase::Collapsing;
        self.clock.time_left = Some(self.map.end_game_secs());
        effects.repeat(TimerKind::Countdown, GameConfig::CLOCK_PERIOD);
        Ok(())
    }

    /// Ends the game, cancels every timer and freezes the world for viewing.
    fn finish(&mut self, outcome: GameOutcome, effects: &mut Effects) -> Result<(), SessionError> {
        self.phase = Phase::Finished(outcome);
        self.clock.running = false;
        self.clock.paused = false;
        self.player.can_step = false;
        effects.timer(TimerRequest::CancelAll);
        self.advanced(effects)?;
        effects.notify(Notification::GameOver(outcome));
        Ok(())
    }

    /// Drops the world and cancels every timer. Safe to call repeatedly.
    pub fn dispose(&mut self) -> Effects {
        self.grid.clear();
        self.ledger.clear();
        self.enemy.clear();
        self.player = PlayerState::new(Coord::from(GameConfig::PLAYER_START));
        self.player.can_step = false;
        self.clock = ClockState::default();
        self.gates_powered = false;
        self.phase = Phase::Disposed;

        let mut effects = Effects::new();
        effects.timer(TimerRequest::CancelAll);
        effects
    }

    // ===== timer ticks =====

    /// Applies one timer expiry. Ticks that arrive after their timer was
    /// cancelled are ignored.
    pub fn tick(&mut self, kind: TimerKind) -> Result<Effects, SessionError> {
        let mut effects = Effects::new();
        if !self.phase.is_active() || !self.clock.running {
            return Ok(effects);
        }

        match kind {
            TimerKind::GameClock if !self.clock.paused => {
                self.clock.game_time += 1;
                self.advanced(&mut effects)?;
            }
            TimerKind::Countdown => self.count_down(&mut effects)?,
            TimerKind::StepCooldown => self.player.can_step = true,
            TimerKind::EnemyClock if !self.clock.paused => self.advance_enemy(&mut effects)?,
            TimerKind::Respawn(at) => self.respawn(at, &mut effects)?,
            TimerKind::GameClock | TimerKind::EnemyClock => {}
        }
        Ok(effects)
    }

    fn count_down(&mut self, effects: &mut Effects) -> Result<(), SessionError> {
        let Some(left) = self.clock.time_left else {
            return Ok(());
        };
        let left = left.saturating_sub(1);
        self.clock.time_left = Some(left);
        if left == 0 {
            self.finish(GameOutcome::Lost, effects)
        } else {
            self.advanced(effects)
        }
    }

    fn respawn(&mut self, at: Coord, effects: &mut Effects) -> Result<(), SessionError> {
        let Some(scrap) = self.ledger.scrap(at) else {
            return Ok(());
        };
        if !scrap.is_respawning() {
            return Ok(());
        }
        let kind = scrap.kind();
        let occupant = self.grid.current(at)?;

        if occupant.is_player() && !self.player.holds(kind) {
            self.player.scraps.insert(kind.flag());
            self.arm_respawn(at, effects);
        } else {
            if occupant.is_player() || occupant.is_enemy() {
                self.grid.set_base(at, Field::Scrap(kind))?;
            } else {
                self.grid.set_current(at, Field::Scrap(kind))?;
            }
            if let Some(scrap) = self.ledger.scrap_mut(at) {
                scrap.set_respawning(false);
            }
        }
        self.advanced(effects)
    }

    fn advance_enemy(&mut self, effects: &mut Effects) -> Result<(), SessionError> {
        let context = PursuitContext {
            player: self.player.position,
            hidden: self.player.hidden,
            key: self.player.key,
            gates_powered: self.gates_powered,
            chase_radius: self.config.chase_radius,
        };
        let action = self
            .enemy
            .decide(&self.grid, &self.ledger, &context, &mut self.rng)?;

        let to = match action {
            EnemyAction::Capture => return self.finish(GameOutcome::Lost, effects),
            EnemyAction::Step(to) => to,
            EnemyAction::Relocate(to) => {
                effects.error(format!(
                    "the adversary was stranded and has been moved to {to}"
                ));
                to
            }
            EnemyAction::Hold { reason } => {
                if let Some(reason) = reason {
                    effects.error(reason);
                }
                return Ok(());
            }
        };

        let interval = self.enemy.interval();
        let captured = self.enemy.move_to(
            &mut self.grid,
            &self.ledger,
            to,
            self.player.position,
            self.map.enemy_speed(),
        )?;
        if captured {
            return self.finish(GameOutcome::Lost, effects);
        }
        if self.enemy.interval() != interval {
            effects.repeat(TimerKind::EnemyClock, self.enemy.interval());
        }
        self.advanced(effects)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::field::ScrapKind;

    const START: Coord = Coord::new(1, 1);

    /// Builds a started session from rows.
    ///
    /// `#` wall, `.` free, `P` player, `E` adversary, `F` open factory,
    /// `b`/`f`/`g`/`p` scrap, `h` heal, `t` bear trap, `w` bush, `~` puddle,
    /// `1`-`4` exit gates.
    fn fixture_with(map: MapConfig, rows: &[&str]) -> GameSession {
        let size = rows.len();
        let mut grid = GridWorld::new(size);
        let mut ledger = EntityLedger::new();
        let mut player = START;
        let mut enemy = Coord::new(size as i32 - 2, size as i32 - 2);

        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.chars().enumerate() {
                let at = Coord::new(x as i32, y as i32);
                let scrap = match cell {
                    'b' => Some(ScrapKind::Bulb),
                    'f' => Some(ScrapKind::Foil),
                    'g' => Some(ScrapKind::Gear),
                    'p' => Some(ScrapKind::Pipe),
                    _ => None,
                };
                if let Some(kind) = scrap {
                    grid.replace(at, Land::item(Field::Scrap(kind), GameConfig::SCRAP_DELAY))
                        .unwrap();
                    ledger.add_scrap(at, kind);
                    continue;
                }
                match cell {
                    '#' => grid.replace(at, Land::blocked(Field::Wall)).unwrap(),
                    'F' => {
                        grid.replace(at, Land::blocked(Field::OpenFactory)).unwrap();
                        ledger.add_factory(at);
                    }
                    'h' => grid.set_current(at, Field::Heal).unwrap(),
                    't' => grid
                        .replace(at, Land::with_delay(Field::BearTrap, GameConfig::BEAR_TRAP_DELAY))
                        .unwrap(),
                    'w' => grid
                        .replace(at, Land::with_delay(Field::Bush, GameConfig::BUSH_DELAY))
                        .unwrap(),
                    '~' => grid
                        .replace(at, Land::with_delay(Field::Puddle, GameConfig::PUDDLE_DELAY))
                        .unwrap(),
                    '1'..='4' => {
                        let index = cell as usize - '1' as usize;
                        grid.replace(at, Land::blocked(Field::ExitGate(KeyId::ALL[index])))
                            .unwrap();
                    }
                    'P' => player = at,
                    'E' => enemy = at,
                    _ => {}
                }
            }
        }
        grid.set_current(player, Field::Player).unwrap();
        let agent = EnemyAgent::place(&mut grid, enemy).unwrap();
        let config = GameConfig {
            sight_size: 5,
            ..GameConfig::default()
        };
        let maze = Maze {
            grid,
            ledger,
            player,
        };
        let mut session = GameSession::assemble(
            maze,
            agent,
            MapConfig {
                table_size: size,
                ..map
            },
            config,
            StdRng::seed_from_u64(1),
        );
        session.start();
        session
    }

    fn fixture(rows: &[&str]) -> GameSession {
        fixture_with(MapConfig::default(), rows)
    }

    /// Seven by seven room; the adversary is sealed off in the bottom right.
    const ROOM: [&str; 7] = [
        "#######", //
        "#P....#", //
        "#.....#", //
        "#.....#", //
        "#...###", //
        "#...#E#", //
        "#######",
    ];

    fn room_with(cells: &[(Coord, char)]) -> Vec<String> {
        let mut rows: Vec<Vec<char>> = ROOM.iter().map(|row| row.chars().collect()).collect();
        for (at, cell) in cells {
            rows[at.y as usize][at.x as usize] = *cell;
        }
        rows.into_iter().map(String::from_iter).collect()
    }

    fn session_with(cells: &[(Coord, char)]) -> GameSession {
        let rows = room_with(cells);
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        fixture(&rows)
    }

    /// Steps and immediately lets the cooldown expire.
    fn walk(session: &mut GameSession, dx: i32, dy: i32) -> Effects {
        let effects = session.step(dx, dy).unwrap();
        session.tick(TimerKind::StepCooldown).unwrap();
        effects
    }

    fn cooldown(effects: &Effects) -> Option<Duration> {
        effects.timers.iter().find_map(|request| match request {
            TimerRequest::Once {
                kind: TimerKind::StepCooldown,
                delay,
            } => Some(*delay),
            _ => None,
        })
    }

    #[test]
    fn new_game_is_created_but_not_running() {
        let (mut session, effects) = GameSession::new(
            MapConfig::default(),
            GameConfig::default(),
            StdRng::seed_from_u64(3),
        )
        .unwrap();

        let view = effects.latest_view().unwrap();
        assert_eq!(view.player, START);
        assert_eq!(view.hp, GameConfig::MAX_HP);
        assert!(!view.running);
        assert_eq!(view.sight.cells.len(), 19 * 19);
        assert!(matches!(
            effects.notifications[0],
            Notification::GameCreated(_)
        ));
        assert!(session.step(1, 0).unwrap().is_empty());

        let started = session.start();
        assert!(started.timers.contains(&TimerRequest::Repeat {
            kind: TimerKind::GameClock,
            period: GameConfig::CLOCK_PERIOD,
        }));
        assert!(started.timers.iter().any(|request| request.kind() == Some(TimerKind::EnemyClock)));
        assert!(session.start().is_empty());
    }

    #[test]
    fn invalid_steps_are_ignored() {
        let mut session = fixture(&ROOM);
        for (dx, dy) in [(1, 1), (2, 0), (0, 0), (-1, 0), (0, -1)] {
            assert!(session.step(dx, dy).unwrap().is_empty());
            assert_eq!(session.player().position, START);
        }

        let effects = session.step(1, 0).unwrap();
        assert_eq!(session.player().position, Coord::new(2, 1));
        assert_eq!(cooldown(&effects), Some(GameConfig::LAND_DELAY));
        // Still cooling down.
        assert!(session.step(1, 0).unwrap().is_empty());
        assert_eq!(session.player().position, Coord::new(2, 1));

        session.tick(TimerKind::StepCooldown).unwrap();
        walk(&mut session, 1, 0);
        assert_eq!(session.player().position, Coord::new(3, 1));
        assert_eq!(session.grid().current(Coord::new(2, 1)), Ok(Field::FreeTile));
    }

    #[test]
    fn bear_trap_wounds_and_is_consumed() {
        let mut session = session_with(&[(Coord::new(2, 1), 't')]);
        let effects = session.step(1, 0).unwrap();

        assert_eq!(session.player().hp, GameConfig::MAX_HP - 1);
        assert_eq!(cooldown(&effects), Some(GameConfig::TRAP_COOLDOWN));
        let trap = *session.grid().land(Coord::new(2, 1)).unwrap();
        assert_eq!(trap.current, Field::TrappedPlayer);
        assert_eq!(trap.base, Field::FreeTile);

        session.tick(TimerKind::StepCooldown).unwrap();
        walk(&mut session, 1, 0);
        assert_eq!(session.grid().current(Coord::new(2, 1)), Ok(Field::FreeTile));
    }

    #[test]
    fn last_hit_point_lost_ends_the_game() {
        let mut session = session_with(&[(Coord::new(2, 1), 't')]);
        session.player.hp = 1;

        let effects = session.step(1, 0).unwrap();
        let outcome = effects.game_over().unwrap();
        assert_eq!(outcome, GameOutcome::Lost);
        assert_eq!(outcome.elapsed_seconds(), -1);
        assert!(effects.timers.contains(&TimerRequest::CancelAll));
        assert_eq!(session.phase(), Phase::Finished(GameOutcome::Lost));
        assert!(session.step(1, 0).unwrap().is_empty());
    }

    #[test]
    fn heals_only_help_the_wounded() {
        let mut session = session_with(&[(Coord::new(2, 1), 'h')]);
        assert!(session.step(1, 0).unwrap().is_empty());
        assert_eq!(session.player().position, START);

        session.player.hp = 3;
        walk(&mut session, 1, 0);
        assert_eq!(session.player().hp, 4);
        walk(&mut session, -1, 0);
        assert_eq!(session.grid().current(Coord::new(2, 1)), Ok(Field::FreeTile));
    }

    #[test]
    fn bushes_hide_and_puddles_slow() {
        let mut session = session_with(&[(Coord::new(2, 1), 'w'), (Coord::new(3, 1), '~')]);
        let effects = walk(&mut session, 1, 0);
        assert!(session.player().hidden);
        assert_eq!(cooldown(&effects), Some(GameConfig::BUSH_DELAY));
        assert_eq!(session.grid().current(Coord::new(2, 1)), Ok(Field::HiddenPlayer));

        let effects = walk(&mut session, 1, 0);
        assert!(!session.player().hidden);
        assert_eq!(cooldown(&effects), Some(GameConfig::PUDDLE_DELAY));
        assert_eq!(session.grid().current(Coord::new(3, 1)), Ok(Field::PlayerInPuddle));
        assert_eq!(session.grid().current(Coord::new(2, 1)), Ok(Field::Bush));
    }

    #[test]
    fn scrap_is_picked_up_once_and_respawns() {
        let at = Coord::new(2, 1);
        let mut session = session_with(&[(at, 'b')]);

        let effects = walk(&mut session, 1, 0);
        assert!(session.player().holds(ScrapKind::Bulb));
        assert_eq!(cooldown(&effects), Some(GameConfig::SCRAP_DELAY));
        let delay = effects
            .timers
            .iter()
            .find_map(|request| match request {
                TimerRequest::Once {
                    kind: TimerKind::Respawn(cell),
                    delay,
                } if *cell == at => Some(*delay),
                _ => None,
            })
            .unwrap();
        assert!(delay >= Duration::from_millis(6000) && delay < Duration::from_millis(11000));

        walk(&mut session, 1, 0);
        assert_eq!(session.grid().current(at), Ok(Field::FreeTile));
        session.tick(TimerKind::Respawn(at)).unwrap();
        assert_eq!(session.grid().current(at), Ok(Field::Scrap(ScrapKind::Bulb)));
        assert!(!session.ledger().scrap(at).unwrap().is_respawning());

        // Already holding a bulb: the pickup blocks the step.
        assert!(session.step(-1, 0).unwrap().is_empty());
        assert_eq!(session.player().position, Coord::new(3, 1));
    }

    #[test]
    fn respawn_under_the_player() {
        let at = Coord::new(2, 1);
        let mut session = session_with(&[(at, 'b')]);
        walk(&mut session, 1, 0);

        // Still holding one: the scrap waits underneath.
        session.tick(TimerKind::Respawn(at)).unwrap();
        assert_eq!(session.grid().base(at), Ok(Field::Scrap(ScrapKind::Bulb)));
        walk(&mut session, 1, 0);
        let land = *session.grid().land(at).unwrap();
        assert_eq!(land.current, Field::Scrap(ScrapKind::Bulb));
        assert_eq!(land.base, Field::FreeTile);

        // Empty-handed player standing on it: picked up again, timer rearmed.
        let mut session = session_with(&[(at, 'b')]);
        walk(&mut session, 1, 0);
        session.player.scraps = ScrapSet::empty();
        let effects = session.tick(TimerKind::Respawn(at)).unwrap();
        assert!(session.player().holds(ScrapKind::Bulb));
        assert!(effects
            .timers
            .iter()
            .any(|request| request.kind() == Some(TimerKind::Respawn(at))));
        assert!(session.ledger().scrap(at).unwrap().is_respawning());
    }

    #[test]
    fn keys_are_swapped() {
        let at = Coord::new(2, 1);
        let mut session = fixture(&ROOM);
        session.grid.set_current(at, Field::Key(KeyId::Two)).unwrap();

        walk(&mut session, 1, 0);
        assert_eq!(session.player().key, Some(KeyId::Two));
        assert_eq!(session.grid().base(at), Ok(Field::FreeTile));

        session.grid.set_current(Coord::new(3, 1), Field::Key(KeyId::Three)).unwrap();
        walk(&mut session, 1, 0);
        assert_eq!(session.player().key, Some(KeyId::Three));
        walk(&mut session, 1, 0);
        assert_eq!(session.grid().current(Coord::new(3, 1)), Ok(Field::Key(KeyId::Two)));
    }

    #[test]
    fn deposits_close_a_factory_once_and_start_the_collapse() {
        let factory = Coord::new(1, 2);
        let mut session = session_with(&[
            (factory, 'F'),
            (Coord::new(3, 3), 'b'),
            (Coord::new(4, 3), 'f'),
            (Coord::new(3, 2), 'g'),
            (Coord::new(4, 2), 'p'),
        ]);

        session.player.scraps = ScrapKind::Bulb.flag();
        let effects = session.handle_space().unwrap();
        assert!(session.player().scraps.is_empty());
        assert_eq!(
            session.ledger().factory(factory).unwrap().deposits(),
            ScrapKind::Bulb.flag()
        );
        assert!(!effects
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::FactoryClosed { .. })));

        let data = session.factory_data();
        assert_eq!(
            data.notifications,
            vec![Notification::FactoryInformation(ScrapKind::Bulb.flag())]
        );

        session.player.scraps = ScrapSet::all();
        let effects = session.handle_space().unwrap();
        // The bulb was already delivered; the player keeps it.
        assert_eq!(session.player().scraps, ScrapKind::Bulb.flag());
        let closed = effects
            .notifications
            .iter()
            .filter(|n| matches!(n, Notification::FactoryClosed { at } if *at == factory))
            .count();
        assert_eq!(closed, 1);
        assert_eq!(session.grid().current(factory), Ok(Field::ClosedFactory));
        assert_eq!(session.enemy().fog().get(factory), Some(Field::ClosedFactory));

        assert!(session.gates_powered());
        assert_eq!(session.phase(), Phase::Collapsing);
        assert_eq!(session.clock().time_left, Some(120));
        assert!(effects.timers.contains(&TimerRequest::Repeat {
            kind: TimerKind::Countdown,
            period: GameConfig::CLOCK_PERIOD,
        }));
        assert_eq!(session.ledger().scrap_count(), 0);
        assert_eq!(session.grid().count_current(Field::is_key), 4);
        assert_eq!(session.grid().count_current(Field::is_scrap), 0);

        // Powered gates: space now tries exits instead of factories.
        let again = session.handle_space().unwrap();
        assert!(again.is_empty());
        assert!(session.factory_data().is_empty());
    }

    #[test]
    fn matching_key_opens_the_exit() {
        let mut rows = room_with(&[(Coord::new(1, 2), 'F'), (Coord::new(3, 3), 'b')]);
        rows[1].replace_range(0..1, "1");
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut session = fixture(&rows);

        for _ in 0..3 {
            session.tick(TimerKind::GameClock).unwrap();
        }
        let filled = session.fill_factories().unwrap();
        assert!(filled
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::FactoryClosed { .. })));
        assert!(session.fill_factories().unwrap().is_empty());

        session.player.key = Some(KeyId::Two);
        assert!(session.handle_space().unwrap().is_empty());

        session.player.key = Some(KeyId::One);
        let effects = session.handle_space().unwrap();
        let outcome = effects.game_over().unwrap();
        assert_eq!(outcome, GameOutcome::Won { elapsed_secs: 3 });
        assert_eq!(outcome.elapsed_seconds(), 3);
        assert_eq!(session.phase(), Phase::Finished(outcome));
    }

    #[test]
    fn fill_hands_over_the_first_key() {
        let mut session = session_with(&[(Coord::new(1, 2), 'F'), (Coord::new(3, 3), 'b')]);
        session.fill_factories().unwrap();
        assert_eq!(session.player().key, Some(KeyId::One));
        assert_eq!(
            session.grid().count_current(|field| field == Field::Key(KeyId::One)),
            0
        );
    }

    #[test]
    fn fill_removes_the_first_key_from_under_the_adversary() {
        let mut session = session_with(&[(Coord::new(1, 2), 'F'), (Coord::new(3, 3), 'b')]);
        let enemy = session.enemy().position();
        session.grid.set_base(enemy, Field::Key(KeyId::One)).unwrap();

        session.fill_factories().unwrap();
        assert_eq!(session.player().key, Some(KeyId::One));
        let first_key = session.grid().iter().filter(|(_, land)| {
            land.base == Field::Key(KeyId::One) || land.current == Field::Key(KeyId::One)
        });
        assert_eq!(first_key.count(), 0);
        assert!(session.grid().current(enemy).unwrap().is_enemy());
    }

    #[test]
    fn keys_without_a_free_cell_are_reported() {
        let mut session = session_with(&[
            (Coord::new(1, 2), 'F'),
            (Coord::new(3, 3), 'b'),
            (Coord::new(4, 2), 'f'),
        ]);
        let effects = session.fill_factories().unwrap();

        let errors: Vec<_> = effects
            .notifications
            .iter()
            .filter(|notification| matches!(notification, Notification::GameError(_)))
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            session.grid().count_current(|field| field.is_key()),
            1
        );
        assert_eq!(session.player().key, Some(KeyId::One));
        assert_eq!(session.phase(), Phase::Collapsing);
    }

    #[test]
    fn countdown_runs_out() {
        let map = MapConfig {
            end_game_time: 2,
            ..MapConfig::default()
        };
        let rows = room_with(&[(Coord::new(1, 2), 'F'), (Coord::new(3, 3), 'b')]);
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut session = fixture_with(map, &rows);

        // Not collapsing yet: countdown ticks do nothing.
        assert!(session.tick(TimerKind::Countdown).unwrap().is_empty());

        session.fill_factories().unwrap();
        session.tick(TimerKind::Countdown).unwrap();
        assert_eq!(session.clock().time_left, Some(1));
        let effects = session.tick(TimerKind::Countdown).unwrap();
        assert_eq!(effects.game_over(), Some(GameOutcome::Lost));
    }

    #[test]
    fn pause_stops_both_clocks() {
        let mut session = fixture(&ROOM);
        let effects = session.toggle_pause().unwrap();
        assert!(session.clock().paused);
        assert!(effects.timers.contains(&TimerRequest::Cancel(TimerKind::GameClock)));
        assert!(effects.timers.contains(&TimerRequest::Cancel(TimerKind::EnemyClock)));

        assert!(session.tick(TimerKind::GameClock).unwrap().is_empty());
        assert!(session.step(1, 0).unwrap().is_empty());
        assert_eq!(session.clock().game_time, 0);

        let effects = session.toggle_pause().unwrap();
        assert!(!session.clock().paused);
        assert!(effects.timers.iter().any(|r| r.kind() == Some(TimerKind::GameClock)));
        session.tick(TimerKind::GameClock).unwrap();
        assert_eq!(session.clock().game_time, 1);
    }

    #[test]
    fn adjacent_adversary_catches_the_player() {
        let mut session = fixture(&[
            "#######", //
            "#PE...#", //
            "#.....#", //
            "#.....#", //
            "#.....#", //
            "#.....#", //
            "#######",
        ]);
        let effects = session.tick(TimerKind::EnemyClock).unwrap();
        assert_eq!(effects.game_over(), Some(GameOutcome::Lost));
    }

    #[test]
    fn adversary_moves_and_reports_progress() {
        let mut session = fixture(&[
            "#######", //
            "#P#####", //
            "#.#####", //
            "#.#####", //
            "#.#####", //
            "#...E.#", //
            "#######",
        ]);
        let start = session.enemy().position();
        let effects = session.tick(TimerKind::EnemyClock).unwrap();
        assert_ne!(session.enemy().position(), start);
        assert!(matches!(
            effects.notifications.last(),
            Some(Notification::GameAdvanced(_))
        ));
        assert_eq!(session.grid().current(start), Ok(Field::FreeTile));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut session = session_with(&[(Coord::new(2, 1), 'b')]);
        walk(&mut session, 1, 0);

        for _ in 0..2 {
            let effects = session.dispose();
            assert_eq!(effects.timers, vec![TimerRequest::CancelAll]);
            assert!(session.grid().is_empty());
            assert!(session.ledger().is_empty());
            assert!(session.enemy().path().is_empty());
            assert_eq!(session.phase(), Phase::Disposed);
            assert_eq!(session.clock().game_time, 0);
            assert!(!session.gates_powered());
        }
        assert!(session.step(1, 0).unwrap().is_empty());
        assert!(session.tick(TimerKind::GameClock).unwrap().is_empty());
    }
}
