//! The adversary: fog-of-war memory, pursuit policy and movement.
mod pathfind;

pub use pathfind::{ChoicePolicy, PathfindError, Pathfinder};

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use arrayvec::ArrayVec;
use rand::Rng;

use crate::config::GameConfig;
use crate::field::{Field, KeyId};
use crate::grid::{Coord, Direction, GridError, GridWorld};
use crate::ledger::EntityLedger;

/// Order in which the adversary inspects its surroundings and branches.
pub(crate) const SCAN_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Left,
    Direction::Down,
    Direction::Up,
];

/// The adversary's private knowledge of the grid.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FogMap {
    size: usize,
    cells: Vec<Field>,
}

impl FogMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Field::Unexplored; size * size],
        }
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        let size = self.size as i32;
        (coord.x >= 0 && coord.y >= 0 && coord.x < size && coord.y < size)
            .then(|| coord.y as usize * self.size + coord.x as usize)
    }

    pub fn get(&self, coord: Coord) -> Option<Field> {
        self.index(coord).map(|index| self.cells[index])
    }

    /// Writes outside the map are ignored.
    pub fn set(&mut self, coord: Coord, field: Field) {
        if let Some(index) = self.index(coord) {
            self.cells[index] = field;
        }
    }

    pub fn is_explored(&self, coord: Coord) -> bool {
        self.get(coord).is_some_and(|field| field != Field::Unexplored)
    }

    pub fn clear(&mut self) {
        self.size = 0;
        self.cells.clear();
    }
}

/// What the adversary knows about the player when it decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PursuitContext {
    pub player: Coord,
    pub hidden: bool,
    pub key: Option<KeyId>,
    pub gates_powered: bool,
    pub chase_radius: u32,
}

/// Outcome of one adversary decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnemyAction {
    /// The player was caught.
    Capture,
    Step(Coord),
    /// Stranded; teleport to a safe cell.
    Relocate(Coord),
    /// Stay put this tick, optionally with a diagnostic.
    Hold { reason: Option<String> },
}

impl EnemyAction {
    fn hold() -> Self {
        Self::Hold { reason: None }
    }

    fn hold_because(reason: impl Into<String>) -> Self {
        Self::Hold {
            reason: Some(reason.into()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnemyAgent {
    position: Coord,
    previous: Coord,
    fog: FogMap,
    /// Consumed from the tail.
    path: Vec<Coord>,
    factory_queue: VecDeque<Coord>,
    explored_factories: BTreeSet<Coord>,
    gates: BTreeMap<KeyId, Coord>,
    interval: Duration,
}

impl EnemyAgent {
    /// Places the adversary on a free cell near the grid center.
    pub fn spawn<R: Rng + ?Sized>(grid: &mut GridWorld, rng: &mut R) -> Option<Self> {
        let half = grid.size() as i32 / 2;
        let mut candidates = Vec::new();
        for x in half - 2..half + 2 {
            for y in half - 2..half + 2 {
                let at = Coord::new(x, y);
                if grid.base_is(at, Field::FreeTile) && grid.current_is(at, Field::FreeTile) {
                    candidates.push(at);
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }

        let position = candidates[rng.gen_range(0..candidates.len())];
        Self::place(grid, position).ok()
    }

    /// Places the adversary at `position` with an empty memory.
    pub fn place(grid: &mut GridWorld, position: Coord) -> Result<Self, GridError> {
        grid.set_current(position, Field::Enemy)?;
        let mut fog = FogMap::new(grid.size());
        fog.set(position, Field::Enemy);

        Ok(Self {
            position,
            previous: position,
            fog,
            path: Vec::new(),
            factory_queue: VecDeque::new(),
            explored_factories: BTreeSet::new(),
            gates: BTreeMap::new(),
            interval: GameConfig::ENEMY_INITIAL_INTERVAL,
        })
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    /// Current step interval; depends on the terrain underfoot.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fog(&self) -> &FogMap {
        &self.fog
    }

    pub fn path(&self) -> &[Coord] {
        &self.path
    }

    pub fn factory_queue(&self) -> &VecDeque<Coord> {
        &self.factory_queue
    }

    pub fn explored_factories(&self) -> &BTreeSet<Coord> {
        &self.explored_factories
    }

    /// Decides the next move. Only [`PathfindError::BacktrackUnderflow`] is
    /// returned as an error; unreachable targets turn into a reasoned hold.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        grid: &GridWorld,
        ledger: &EntityLedger,
        context: &PursuitContext,
        rng: &mut R,
    ) -> Result<EnemyAction, PathfindError> {
        let mut unexplored: ArrayVec<Coord, 4> = ArrayVec::new();
        let mut known: ArrayVec<Coord, 4> = ArrayVec::new();
        let mut came_from = None;

        for direction in SCAN_ORDER {
            let at = self.position.step(direction);
            let Some(land) = grid.get(at) else {
                continue;
            };
            if land.current.is_visible_player() {
                return Ok(EnemyAction::Capture);
            }
            if land.current == Field::OpenFactory {
                self.explored_factories.insert(at);
                if !self.factory_queue.contains(&at) {
                    self.factory_queue.push_back(at);
                }
            }
            if land.occupied || land.current.is_pickup() {
                self.fog.set(at, land.current);
                continue;
            }
            if at == self.previous {
                came_from = Some(at);
            }
            if self.fog.is_explored(at) {
                known.push(at);
            } else {
                unexplored.push(at);
            }
        }

        let open_factories = ledger.open_factory_count();

        if self.can_chase(grid, context) {
            self.chase(grid, context, rng)
        } else if let (true, Some(key)) = (context.gates_powered, context.key) {
            if self.path.is_empty() {
                let Some(gate) = self.gate(grid, key) else {
                    return Ok(EnemyAction::hold_because(format!("exit gate {key} is missing")));
                };
                match Pathfinder::new(&self.fog, ChoicePolicy::Greedy).find(
                    self.position,
                    gate,
                    false,
                    rng,
                ) {
                    Ok(path) => self.path = path,
                    Err(error @ PathfindError::Unreachable { .. }) => {
                        return Ok(EnemyAction::hold_because(error.to_string()));
                    }
                    Err(error) => return Err(error),
                }
            }
            Ok(self.follow_path())
        } else if !unexplored.is_empty() {
            self.path.clear();
            Ok(EnemyAction::Step(
                unexplored[rng.gen_range(0..unexplored.len())],
            ))
        } else if self.factory_queue.len() >= open_factories && open_factories >= 2 {
            self.sweep_factories(rng)
        } else if !known.is_empty() {
            self.path.clear();
            if known.len() > 1
                && let Some(back) = came_from
            {
                known.retain(|at| *at != back);
            }
            Ok(EnemyAction::Step(known[rng.gen_range(0..known.len())]))
        } else {
            Ok(self.relocation(grid, rng))
        }
    }

    fn can_chase(&self, grid: &GridWorld, context: &PursuitContext) -> bool {
        grid.contains(context.player)
            && self.position.chebyshev(context.player) <= context.chase_radius
            && self.fog.is_explored(context.player)
            && !context.hidden
    }

    fn chase<R: Rng + ?Sized>(
        &mut self,
        grid: &GridWorld,
        context: &PursuitContext,
        rng: &mut R,
    ) -> Result<EnemyAction, PathfindError> {
        let player = context.player;
        let too_long = self.path.len() as f64 >= 1.5 * grid.size() as f64;
        if self.path.len() <= 1 || too_long || !self.path.contains(&player) {
            match Pathfinder::new(&self.fog, ChoicePolicy::Random).find(
                self.position,
                player,
                true,
                rng,
            ) {
                Ok(path) => self.path = path,
                Err(error @ PathfindError::Unreachable { .. }) => {
                    self.path.clear();
                    return Ok(EnemyAction::hold_because(error.to_string()));
                }
                Err(error) => return Err(error),
            }
        }

        if self.path.len() == 1 && self.path.contains(&player) {
            return Ok(EnemyAction::Capture);
        }
        Ok(self.follow_path())
    }

    /// Routes between known open factories, cycling the queue.
    fn sweep_factories<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EnemyAction, PathfindError> {
        if self.path.is_empty() {
            let mut rotations = 0;
            while self.factory_queue.len() > 1 {
                let front = self.factory_queue[0];
                if self.fog.get(front) != Some(Field::OpenFactory) {
                    self.factory_queue.pop_front();
                } else if front.is_adjacent(self.position) {
                    self.factory_queue.rotate_left(1);
                    rotations += 1;
                    if rotations >= self.factory_queue.len() {
                        self.factory_queue.clear();
                        break;
                    }
                } else {
                    break;
                }
            }

            if self.factory_queue.len() >= 2 {
                let target = self.factory_queue[0];
                match Pathfinder::new(&self.fog, ChoicePolicy::Greedy).find(
                    self.position,
                    target,
                    false,
                    rng,
                ) {
                    Ok(path) => self.path = path,
                    Err(error @ PathfindError::Unreachable { .. }) => {
                        self.factory_queue.rotate_left(1);
                        return Ok(EnemyAction::hold_because(error.to_string()));
                    }
                    Err(error) => return Err(error),
                }
                self.factory_queue.rotate_left(1);
            }
        }

        if self.path.is_empty() || self.factory_queue.len() <= 1 {
            return Ok(EnemyAction::hold());
        }
        Ok(self.follow_path())
    }

    /// Pops the next step, dropping a path that no longer starts here.
    fn follow_path(&mut self) -> EnemyAction {
        match self.path.pop() {
            Some(next) if next.is_adjacent(self.position) => EnemyAction::Step(next),
            Some(next) => {
                self.path.clear();
                EnemyAction::hold_because(format!(
                    "stale path step {next} is not next to {}",
                    self.position
                ))
            }
            None => EnemyAction::hold(),
        }
    }

    /// Picks a row-one cell away from the player.
    fn relocation<R: Rng + ?Sized>(&self, grid: &GridWorld, rng: &mut R) -> EnemyAction {
        let near_player = |at: Coord| grid.get(at).is_some_and(|land| land.current.is_player());
        let size = grid.size() as i32;
        let candidates: Vec<Coord> = (1..size - 1)
            .map(|y| Coord::new(1, y))
            .filter(|at| {
                grid.get(*at).is_some_and(|land| !land.occupied)
                    && at != &self.position
                    && !near_player(*at)
                    && !near_player(at.offset(0, -1))
                    && !near_player(at.offset(0, 1))
                    && !near_player(at.offset(1, 0))
            })
            .collect();

        if candidates.is_empty() {
            return EnemyAction::hold_because("adversary is stranded with no safe cell to move to");
        }
        EnemyAction::Relocate(candidates[rng.gen_range(0..candidates.len())])
    }

    fn gate(&mut self, grid: &GridWorld, key: KeyId) -> Option<Coord> {
        if self.gates.is_empty() {
            for (at, land) in grid.iter() {
                if let Some(gate) = land.base.gate() {
                    self.gates.insert(gate, at);
                }
            }
        }
        self.gates.get(&key).copied()
    }

    /// Moves onto `to`, restoring the cell left behind. Returns true when the
    /// move lands on the player.
    pub fn move_to(
        &mut self,
        grid: &mut GridWorld,
        ledger: &EntityLedger,
        to: Coord,
        player: Coord,
        enemy_speed: Duration,
    ) -> Result<bool, GridError> {
        grid.land(to)?;

        let from = self.position;
        let left = grid.land_mut(from)?;
        left.restore();
        self.fog.set(from, left.base);
        // A scrap that respawned underneath shows again once uncovered.
        if ledger.has_scrap(from) {
            left.base = Field::FreeTile;
        }

        self.previous = from;
        self.position = to;
        if to == player {
            return Ok(true);
        }

        let land = grid.land_mut(to)?;
        let (overlay, interval) = match land.base {
            Field::Puddle => (Field::EnemyInPuddle, GameConfig::ENEMY_PUDDLE_INTERVAL),
            Field::BearTrap => (Field::TrappedEnemy, GameConfig::ENEMY_TRAP_INTERVAL),
            Field::Bush => (Field::HiddenEnemy, GameConfig::ENEMY_BUSH_INTERVAL),
            _ => (Field::Enemy, enemy_speed),
        };
        land.current = overlay;
        self.fog.set(to, overlay);
        self.interval = interval;
        Ok(false)
    }

    /// Drops a closed factory from the exploration bookkeeping.
    pub fn forget_factory(&mut self, at: Coord) {
        self.explored_factories.remove(&at);
        self.fog.set(at, Field::ClosedFactory);
    }

    pub fn clear(&mut self) {
        self.fog.clear();
        self.path.clear();
        self.factory_queue.clear();
        self.explored_factories.clear();
        self.gates.clear();
    }

    /// Replaces the fog with the real grid; the player's cell shows its base.
    pub fn reveal(&mut self, grid: &GridWorld, player: Coord) {
        for (at, land) in grid.iter() {
            let seen = if at == player { land.base } else { land.current };
            self.fog.set(at, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::grid::Land;

    /// Rows: `#` wall, `.` free, `P` player, `F` open factory, `E` enemy spawn.
    fn world(rows: &[&str]) -> (GridWorld, EnemyAgent, Coord) {
        let mut grid = GridWorld::new(rows.len());
        let mut enemy = Coord::ORIGIN;
        let mut player = Coord::ORIGIN;
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.chars().enumerate() {
                let at = Coord::new(x as i32, y as i32);
                match cell {
                    '#' => grid.replace(at, Land::blocked(Field::Wall)).unwrap(),
                    'F' => grid.replace(at, Land::blocked(Field::OpenFactory)).unwrap(),
                    'P' => {
                        grid.set_current(at, Field::Player).unwrap();
                        player = at;
                    }
                    'E' => enemy = at,
                    _ => {}
                }
            }
        }
        let agent = EnemyAgent::place(&mut grid, enemy).unwrap();
        (grid, agent, player)
    }

    fn context(player: Coord) -> PursuitContext {
        PursuitContext {
            player,
            hidden: false,
            key: None,
            gates_powered: false,
            chase_radius: GameConfig::DEFAULT_CHASE_RADIUS,
        }
    }

    #[test]
    fn adjacent_visible_player_is_captured() {
        let (grid, mut agent, player) = world(&["#####", "#EP.#", "#####", "#####", "#####"]);
        let mut rng = StdRng::seed_from_u64(0);
        let action = agent
            .decide(&grid, &EntityLedger::new(), &context(player), &mut rng)
            .unwrap();
        assert_eq!(action, EnemyAction::Capture);
    }

    #[test]
    fn hidden_player_is_not_seen() {
        let (mut grid, mut agent, player) = world(&["#####", "#EP.#", "#####", "#####", "#####"]);
        grid.set_current(player, Field::HiddenPlayer).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let action = agent
            .decide(
                &grid,
                &EntityLedger::new(),
                &PursuitContext {
                    hidden: true,
                    ..context(player)
                },
                &mut rng,
            )
            .unwrap();
        // The hidden player's cell is still an unexplored open tile.
        assert_eq!(action, EnemyAction::Step(player));
    }

    #[test]
    fn explores_unexplored_neighbours_first() {
        let (grid, mut agent, _) = world(&["#####", "#.E.#", "#####", "#####", "#P###"]);
        let mut rng = StdRng::seed_from_u64(3);
        let action = agent
            .decide(&grid, &EntityLedger::new(), &context(Coord::new(1, 4)), &mut rng)
            .unwrap();
        assert!(matches!(
            action,
            EnemyAction::Step(at) if at == Coord::new(1, 1) || at == Coord::new(3, 1)
        ));
    }

    #[test]
    fn patrol_avoids_stepping_back() {
        let (grid, mut agent, _) = world(&["#####", "#.E.#", "#####", "#####", "#P###"]);
        agent.fog.set(Coord::new(1, 1), Field::FreeTile);
        agent.fog.set(Coord::new(3, 1), Field::FreeTile);
        agent.previous = Coord::new(1, 1);

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let action = agent
                .decide(&grid, &EntityLedger::new(), &context(Coord::new(1, 4)), &mut rng)
                .unwrap();
            assert_eq!(action, EnemyAction::Step(Coord::new(3, 1)));
        }
    }

    #[test]
    fn chases_a_visible_player_within_range() {
        let (grid, mut agent, player) = world(&[
            "#######", //
            "#E....#", //
            "#####.#", //
            "#P....#", //
            "#######", //
            "#######", //
            "#######",
        ]);
        for x in 1..6 {
            agent.fog.set(Coord::new(x, 1), Field::FreeTile);
            agent.fog.set(Coord::new(x, 3), Field::FreeTile);
        }
        agent.fog.set(Coord::new(5, 2), Field::FreeTile);
        let mut rng = StdRng::seed_from_u64(5);

        let action = agent
            .decide(&grid, &EntityLedger::new(), &context(player), &mut rng)
            .unwrap();
        assert_eq!(action, EnemyAction::Step(Coord::new(2, 1)));
        assert_eq!(agent.path().first(), Some(&player));
    }

    #[test]
    fn open_factories_are_queued_once() {
        let (grid, mut agent, _) = world(&["#####", "#FE.#", "#####", "#####", "#P###"]);
        let mut rng = StdRng::seed_from_u64(1);
        let ledger = EntityLedger::new();
        for _ in 0..2 {
            agent
                .decide(&grid, &ledger, &context(Coord::new(1, 4)), &mut rng)
                .unwrap();
        }
        assert_eq!(agent.factory_queue().len(), 1);
        assert!(agent.explored_factories().contains(&Coord::new(1, 1)));
        assert_eq!(agent.fog().get(Coord::new(1, 1)), Some(Field::OpenFactory));

        agent.forget_factory(Coord::new(1, 1));
        assert!(agent.explored_factories().is_empty());
        assert_eq!(agent.fog().get(Coord::new(1, 1)), Some(Field::ClosedFactory));
    }

    #[test]
    fn boxed_in_adversary_is_relocated_to_row_one() {
        let (grid, mut agent, player) = world(&[
            "#######", //
            "#.#####", //
            "#.#####", //
            "#.##E##", //
            "#######", //
            "#.P...#", //
            "#######",
        ]);
        let mut rng = StdRng::seed_from_u64(2);
        let action = agent
            .decide(&grid, &EntityLedger::new(), &context(player), &mut rng)
            .unwrap();
        assert!(matches!(action, EnemyAction::Relocate(at) if at.x == 1 && (1..=3).contains(&at.y)));
    }

    #[test]
    fn terrain_sets_overlay_and_interval() {
        let (mut grid, mut agent, _) = world(&["#####", "#E..#", "#####", "#####", "#P###"]);
        grid.change_land(Coord::new(2, 1), Field::Puddle, false).unwrap();
        grid.change_land(Coord::new(3, 1), Field::Bush, false).unwrap();
        let ledger = EntityLedger::new();
        let speed = Duration::from_millis(700);

        let caught = agent
            .move_to(&mut grid, &ledger, Coord::new(2, 1), Coord::new(1, 4), speed)
            .unwrap();
        assert!(!caught);
        assert_eq!(grid.current(Coord::new(2, 1)), Ok(Field::EnemyInPuddle));
        assert_eq!(grid.current(Coord::new(1, 1)), Ok(Field::FreeTile));
        assert_eq!(agent.interval(), GameConfig::ENEMY_PUDDLE_INTERVAL);

        agent
            .move_to(&mut grid, &ledger, Coord::new(3, 1), Coord::new(1, 4), speed)
            .unwrap();
        assert_eq!(grid.current(Coord::new(3, 1)), Ok(Field::HiddenEnemy));
        assert_eq!(grid.current(Coord::new(2, 1)), Ok(Field::Puddle));
        assert_eq!(agent.fog().get(Coord::new(2, 1)), Some(Field::Puddle));

        agent
            .move_to(&mut grid, &ledger, Coord::new(2, 1), Coord::new(1, 4), speed)
            .unwrap();
        agent
            .move_to(&mut grid, &ledger, Coord::new(1, 1), Coord::new(1, 4), speed)
            .unwrap();
        assert_eq!(agent.interval(), speed);
    }

    #[test]
    fn stepping_onto_the_player_is_capture() {
        let (mut grid, mut agent, player) = world(&["#####", "#EP.#", "#####", "#####", "#####"]);
        let caught = agent
            .move_to(
                &mut grid,
                &EntityLedger::new(),
                player,
                player,
                GameConfig::ENEMY_INITIAL_INTERVAL,
            )
            .unwrap();
        assert!(caught);
    }

    #[test]
    fn spawn_lands_near_the_center() {
        let mut grid = GridWorld::new(19);
        let mut rng = StdRng::seed_from_u64(8);
        let agent = EnemyAgent::spawn(&mut grid, &mut rng).unwrap();
        let at = agent.position();
        assert!((7..11).contains(&at.x) && (7..11).contains(&at.y));
        assert_eq!(grid.current(at), Ok(Field::Enemy));
        assert_eq!(agent.fog().get(at), Some(Field::Enemy));

        let mut walled = GridWorld::filled(19, Land::blocked(Field::Wall));
        assert!(EnemyAgent::spawn(&mut walled, &mut rng).is_none());
    }
}
