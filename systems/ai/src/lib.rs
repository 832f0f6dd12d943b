#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Decision making for computer-controlled players.
//!
//! A [`DecisionEngine`] turns [`GameStateSnapshot`] values into one [`Action`]
//! per cycle. Engines run on their own [`AiWorker`] thread and never touch
//! the world; the [`AiController`] feeds them snapshots and turns their
//! actions back into button presses.

mod controller;
mod memory;
mod worker;

use std::time::Duration;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wizard_maze_core::{
    Action, CellCoord, Direction, GameStateSnapshot, MazeLayout, PixelPoint, PlayerSlot,
    ScoreTable, Shooter, TeammateSnapshot, Tuning, CELL_HEIGHT, CELL_WIDTH,
};
use wizard_maze_system_pathfinding::{find_path, Algorithm};

pub use controller::AiController;
pub use memory::Memory;
pub use worker::{AiWorker, SNAPSHOT_QUEUE_CAPACITY};

use memory::KnownMaze;

const THREAT_ALIGNMENT: f32 = 6.0;
const OPPORTUNITY_ALIGNMENT: f32 = 8.0;
const VIEW_DISTANCE_CELLS: f32 = 8.0;
const SAFETY_RADIUS: f32 = 15.0;
const SHOOT_RANGE: (f32, f32) = (10.0, 60.0);
const TEAM_SPREAD: (f32, f32) = (40.0, 60.0);
const BULLET_LOOKAHEAD_SECONDS: f32 = 0.5;
const BULLET_LANE: f32 = 12.0;
const RANDOM_FIRE_CHANCE: f64 = 0.1;
const RANDOM_FIRE_COOLDOWN: Duration = Duration::from_millis(800);
const OPPORTUNITY_COOLDOWN: Duration = Duration::from_millis(400);
const CHASE_FIRE_CHANCE: f64 = 0.25;
const CHASE_FIRE_COOLDOWN: Duration = Duration::from_millis(600);
const STATIONARY_LIMIT: Duration = Duration::from_secs(2);
const TURN_PATIENCE: Duration = Duration::from_millis(250);
const STUCK_LIMIT: u32 = 5;
/// Simulated time between two samples of the stuck counter.
const STUCK_SAMPLE: Duration = Duration::from_millis(100);
const WANDER_STUCK_LIMIT: u32 = 2;
const FAR_TARGET_CELLS: u32 = 3;

/// Guard cells per maze as `(name, left-side post, right-side post)`.
const GUARD_POSTS: [(&str, CellCoord, CellCoord); 10] = [
    ("Level1", CellCoord::new(6, 2), CellCoord::new(6, 5)),
    ("Level2", CellCoord::new(6, 5), CellCoord::new(6, 4)),
    ("Level3", CellCoord::new(6, 2), CellCoord::new(5, 6)),
    ("Level4", CellCoord::new(4, 1), CellCoord::new(6, 5)),
    ("Level5", CellCoord::new(6, 3), CellCoord::new(4, 6)),
    ("Level6", CellCoord::new(6, 2), CellCoord::new(5, 6)),
    ("Level7", CellCoord::new(6, 2), CellCoord::new(6, 3)),
    ("Level8", CellCoord::new(6, 4), CellCoord::new(8, 2)),
    ("Level9", CellCoord::new(6, 2), CellCoord::new(10, 2)),
    ("Level10", CellCoord::new(6, 2), CellCoord::new(10, 2)),
];

/// Guard cell a fixed-post AI takes on the named maze.
///
/// Unknown mazes use the first maze's posts.
#[must_use]
pub fn guard_post(level_name: &str, left_side: bool) -> CellCoord {
    let (_, left, right) = GUARD_POSTS
        .iter()
        .find(|(name, _, _)| *name == level_name)
        .copied()
        .unwrap_or(GUARD_POSTS[0]);
    if left_side {
        left
    } else {
        right
    }
}

/// Behaviour profile of a computer-controlled player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AiVariant {
    /// Weighs shooting, hunting, teamwork and exploration evenly.
    #[default]
    Balanced,
    /// Decides without delay and favours hunting and shooting.
    Aggressive,
    /// Walks to a guard cell once and defends it.
    FixedPost,
}

impl AiVariant {
    /// Weights of the scored action table.
    #[must_use]
    pub const fn weights(self) -> Weights {
        match self {
            AiVariant::Aggressive => Weights {
                shoot: 10.0,
                hunt: 10.0,
                cooperation: 7.0,
                exploration: 0.5,
            },
            AiVariant::Balanced | AiVariant::FixedPost => Weights {
                shoot: 8.0,
                hunt: 6.0,
                cooperation: 5.0,
                exploration: 4.0,
            },
        }
    }

    /// Interval between decisions taken without a fresh snapshot.
    #[must_use]
    pub const fn decision_interval(self) -> Duration {
        match self {
            AiVariant::Aggressive => Duration::ZERO,
            AiVariant::Balanced | AiVariant::FixedPost => Duration::from_millis(50),
        }
    }
}

/// Base scores of the options in the action table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    /// Firing at an enemy.
    pub shoot: f32,
    /// Walking toward the most valuable enemy.
    pub hunt: f32,
    /// Keeping a useful distance to the teammate.
    pub cooperation: f32,
    /// Wandering through open corridors.
    pub exploration: f32,
}

/// Progress of a fixed-post AI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostMode {
    /// Waiting to leave the cage and pick a post.
    Init,
    /// Walking to the guard cell.
    MoveToTarget,
    /// Holding the guard cell.
    Guard,
}

#[derive(Debug, Default)]
struct Ballot {
    entries: Vec<(Action, f32)>,
}

impl Ballot {
    fn propose(&mut self, action: Action, weight: f32) {
        match self.entries.iter_mut().find(|(known, _)| *known == action) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((action, weight)),
        }
    }

    fn withdraw(&mut self, action: Action) {
        self.entries.retain(|(known, _)| *known != action);
    }

    fn pick(self, rng: &mut ChaCha8Rng) -> Option<Action> {
        self.entries
            .into_iter()
            .map(|(action, weight)| (action, weight + rng.gen_range(0.0..1.0)))
            .fold(None, |best: Option<(Action, f32)>, candidate| match best {
                Some(best) if best.1 >= candidate.1 => Some(best),
                _ => Some(candidate),
            })
            .map(|(action, _)| action)
    }
}

/// Per-player decision maker.
#[derive(Debug)]
pub struct DecisionEngine {
    slot: PlayerSlot,
    variant: AiVariant,
    weights: Weights,
    scores: ScoreTable,
    rng: ChaCha8Rng,
    memory: Memory,
    state: Option<GameStateSnapshot>,
    clock: Duration,
    post: PostMode,
    post_target: Option<CellCoord>,
    pending_turn: Option<(Direction, Duration)>,
    progress_sampled_at: Option<Duration>,
}

impl DecisionEngine {
    /// Creates an engine with an empty memory.
    #[must_use]
    pub fn new(slot: PlayerSlot, variant: AiVariant, seed: u64) -> Self {
        Self {
            slot,
            variant,
            weights: variant.weights(),
            scores: Tuning::default().scores,
            rng: ChaCha8Rng::seed_from_u64(seed),
            memory: Memory::default(),
            state: None,
            clock: Duration::ZERO,
            post: PostMode::Init,
            post_target: None,
            pending_turn: None,
            progress_sampled_at: None,
        }
    }

    /// Slot the engine plays for.
    #[must_use]
    pub const fn slot(&self) -> PlayerSlot {
        self.slot
    }

    /// Behaviour profile.
    #[must_use]
    pub const fn variant(&self) -> AiVariant {
        self.variant
    }

    /// Accumulated knowledge.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Current fixed-post progress.
    #[must_use]
    pub const fn post_mode(&self) -> PostMode {
        self.post
    }

    /// Guard cell chosen for the current life, if any.
    #[must_use]
    pub const fn post_target(&self) -> Option<CellCoord> {
        self.post_target
    }

    /// Simulated time of the latest observation or tick.
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// Whether at least one snapshot has been observed.
    #[must_use]
    pub const fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Folds a fresh snapshot into the memory.
    pub fn observe(&mut self, snapshot: GameStateSnapshot) {
        if snapshot.in_cage {
            self.memory.respawn();
            self.post = PostMode::Init;
            self.post_target = None;
            self.pending_turn = None;
            self.progress_sampled_at = None;
        }
        self.memory.record(&snapshot);
        self.clock = self.clock.max(snapshot.elapsed);
        self.state = Some(snapshot);
    }

    /// Decides on the latest observation.
    ///
    /// The position is sampled on the simulated clock; a roaming player that
    /// has not moved for several samples reverses its last move instead.
    pub fn decide(&mut self) -> Action {
        let Some(state) = self.state.take() else {
            return Action::NoAction;
        };
        let mut action = match self.variant {
            AiVariant::FixedPost => self.decide_fixed_post(&state),
            AiVariant::Balanced | AiVariant::Aggressive => self.decide_roaming(&state),
        };
        if let Some(escape) = self.track_progress(&state) {
            action = escape;
        }
        self.state = Some(state);
        self.memory.last_action = Some(action);
        action
    }

    /// Decides on the timer when no snapshot arrived.
    pub fn tick(&mut self, now: Duration) -> Action {
        self.clock = self.clock.max(now);
        self.decide()
    }

    fn track_progress(&mut self, state: &GameStateSnapshot) -> Option<Action> {
        if state.in_cage {
            return None;
        }
        if self
            .progress_sampled_at
            .is_some_and(|sampled| self.clock.saturating_sub(sampled) < STUCK_SAMPLE)
        {
            return None;
        }
        self.progress_sampled_at = Some(self.clock);

        if self.memory.last_position == Some(state.position) {
            self.memory.stuck_counter += 1;
        } else {
            self.memory.stuck_counter = 0;
        }
        self.memory.last_position = Some(state.position);

        if self.memory.stuck_counter <= STUCK_LIMIT || self.variant == AiVariant::FixedPost {
            return None;
        }
        let action = self.unstuck();
        self.memory.stuck_counter = 0;
        self.memory.forget_route();
        log::debug!("{:?} AI stuck; trying {action:?}", self.slot);
        Some(action)
    }

    fn decide_roaming(&mut self, state: &GameStateSnapshot) -> Action {
        if state.in_cage {
            return Action::MoveUp;
        }
        if let Some(action) = self.scan_and_fire(state) {
            return action;
        }
        if let Some(action) = self.evade_bullets(state) {
            return action;
        }
        let Some(cell) = MazeLayout::aligned_cell(state.position) else {
            return Action::toward(state.direction);
        };

        let mut ballot = Ballot::default();
        let stationary = self.clock.saturating_sub(self.memory.last_moved_at);
        let exploration = if stationary > STATIONARY_LIMIT {
            self.weights.exploration * 2.0
        } else {
            self.weights.exploration
        };

        if self.rng.gen_bool(RANDOM_FIRE_CHANCE) && self.fire_ready(RANDOM_FIRE_COOLDOWN) {
            self.memory.last_fired = Some(self.clock);
            ballot.propose(Action::Shoot, self.weights.shoot);
        }

        if let Some((direction, distance)) = nearest_threat(state) {
            if direction == state.direction {
                if distance > SHOOT_RANGE.0 && distance < SHOOT_RANGE.1 {
                    self.memory.last_fired = Some(self.clock);
                    ballot.propose(Action::Shoot, self.weights.shoot * 1.8);
                }
            } else if distance > SHOOT_RANGE.0 {
                ballot.propose(Action::toward(direction), self.weights.hunt * 1.2);
            }
        }

        match self.shooting_opportunity(state) {
            Some(Action::Shoot) => ballot.propose(Action::Shoot, self.weights.shoot),
            Some(turn) if is_safe(state, turn) => ballot.propose(turn, self.weights.shoot * 0.8),
            _ => {}
        }

        if let Some(action) = self.hunt(state, cell) {
            if action == Action::Shoot || is_safe(state, action) {
                ballot.propose(action, self.weights.hunt);
            }
        }

        if let Some(teammate) = state.teammate.as_ref().filter(|_| state.cooperative) {
            if let Some(action) = self.cooperate(state, cell, teammate) {
                if is_safe(state, action) {
                    ballot.propose(action, self.weights.cooperation);
                }
            }
        }

        let explore = self.explore(state, cell);
        ballot.propose(explore, exploration);
        if state.has_bullet {
            ballot.withdraw(Action::Shoot);
        }

        ballot.pick(&mut self.rng).unwrap_or(Action::NoAction)
    }

    fn decide_fixed_post(&mut self, state: &GameStateSnapshot) -> Action {
        if state.in_cage {
            return Action::MoveUp;
        }

        if self.post == PostMode::Init {
            let Some(start) = self.memory.starting_cell else {
                return Action::NoAction;
            };
            let left_side = start.column() < state.layout.width() / 2;
            let target = guard_post(state.layout.name(), left_side);
            log::info!(
                "{:?} AI guarding ({}, {}) on {}",
                self.slot,
                target.column(),
                target.row(),
                state.layout.name()
            );
            self.post_target = Some(target);
            self.post = PostMode::MoveToTarget;
        }

        let Some(target) = self.post_target else {
            return Action::NoAction;
        };
        let current = CellCoord::containing(state.position);

        match self.post {
            PostMode::Init => Action::NoAction,
            PostMode::MoveToTarget => {
                if let Some(action) = self.scan_and_fire(state) {
                    return action;
                }
                let Some(cell) = current.filter(|_| MazeLayout::aligned_cell(state.position).is_some())
                else {
                    return Action::NoAction;
                };
                if cell == target {
                    self.post = PostMode::Guard;
                    self.memory.forget_route();
                    log::info!("{:?} AI reached its post", self.slot);
                    return Action::NoAction;
                }
                self.route(state, cell, target)
                    .map_or(Action::NoAction, Action::toward)
            }
            PostMode::Guard => {
                if current != Some(target) {
                    self.post = PostMode::MoveToTarget;
                    return Action::NoAction;
                }
                self.guard(state)
            }
        }
    }

    fn guard(&mut self, state: &GameStateSnapshot) -> Action {
        if let Some((direction, since)) = self.pending_turn {
            let patient = self.clock.saturating_sub(since) < TURN_PATIENCE;
            if state.direction != direction && patient {
                return Action::NoAction;
            }
            self.pending_turn = None;
        }
        match self.scan_and_fire(state) {
            Some(Action::Shoot) => Action::Shoot,
            Some(turn) => match turn.direction() {
                Some(direction) => {
                    self.pending_turn = Some((direction, self.clock));
                    turn
                }
                None => Action::NoAction,
            },
            None => Action::NoAction,
        }
    }

    /// Turns toward or fires at an enemy lined up in a cardinal direction with
    /// nothing in between.
    fn scan_and_fire(&self, state: &GameStateSnapshot) -> Option<Action> {
        let half_width = CELL_WIDTH as f32 / 2.0;
        let half_height = CELL_HEIGHT as f32 / 2.0;
        let reach_x = VIEW_DISTANCE_CELLS * CELL_WIDTH as f32;
        let reach_y = VIEW_DISTANCE_CELLS * CELL_HEIGHT as f32;

        for enemy in state.enemies.iter().filter(|enemy| enemy.visible) {
            let dx = enemy.position.x - state.position.x;
            let dy = enemy.position.y - state.position.y;
            let direction = if dy.abs() < half_height && dx.abs() <= reach_x {
                if dx > 0.0 {
                    Direction::East
                } else {
                    Direction::West
                }
            } else if dx.abs() < half_width && dy.abs() <= reach_y {
                if dy > 0.0 {
                    Direction::South
                } else {
                    Direction::North
                }
            } else {
                continue;
            };

            if !line_of_sight(&state.layout, state.position, enemy.position) {
                continue;
            }
            if state.direction != direction {
                return Some(Action::toward(direction));
            }
            if !state.has_bullet {
                return Some(Action::Shoot);
            }
        }
        None
    }

    fn evade_bullets(&self, state: &GameStateSnapshot) -> Option<Action> {
        let cell = MazeLayout::aligned_cell(state.position)?;
        let maze = KnownMaze {
            layout: &state.layout,
            memory: &self.memory,
        };

        for bullet in &state.bullets {
            if bullet.shooter == Shooter::Player(state.slot)
                || !bullet_threatens(bullet.position, bullet.velocity, state.position)
            {
                continue;
            }
            let offset_x = bullet.position.x - state.position.x;
            let offset_y = bullet.position.y - state.position.y;
            let escapes = if bullet.velocity.x.abs() > bullet.velocity.y.abs() {
                if offset_y > 0.0 {
                    [Direction::North, Direction::South]
                } else {
                    [Direction::South, Direction::North]
                }
            } else if offset_x > 0.0 {
                [Direction::West, Direction::East]
            } else {
                [Direction::East, Direction::West]
            };
            if let Some(direction) = escapes
                .into_iter()
                .find(|direction| maze.is_open(cell, *direction))
            {
                return Some(Action::toward(direction));
            }
        }
        None
    }

    fn shooting_opportunity(&mut self, state: &GameStateSnapshot) -> Option<Action> {
        if !self.fire_ready(OPPORTUNITY_COOLDOWN) {
            return None;
        }
        for enemy in state.enemies.iter().filter(|enemy| enemy.visible) {
            let horizontal = (enemy.position.y - state.position.y).abs() < OPPORTUNITY_ALIGNMENT;
            let vertical = (enemy.position.x - state.position.x).abs() < OPPORTUNITY_ALIGNMENT;
            if !horizontal && !vertical {
                continue;
            }
            if !line_of_sight(&state.layout, state.position, enemy.position) {
                continue;
            }

            let direction = if horizontal {
                if enemy.position.x > state.position.x {
                    Direction::East
                } else {
                    Direction::West
                }
            } else if enemy.position.y > state.position.y {
                Direction::South
            } else {
                Direction::North
            };

            if state.direction != direction {
                self.memory.shoot_after_turn = true;
                return Some(Action::toward(direction));
            }
            if std::mem::take(&mut self.memory.shoot_after_turn) || self.rng.gen_bool(0.9) {
                self.memory.last_fired = Some(self.clock);
                return Some(Action::Shoot);
            }
        }
        None
    }

    /// Heads for the enemy with the best score-to-distance ratio.
    fn hunt(&mut self, state: &GameStateSnapshot, cell: CellCoord) -> Option<Action> {
        let mut best: Option<(f32, CellCoord)> = None;
        for enemy in state.enemies.iter().filter(|enemy| enemy.visible) {
            let Some(goal) = CellCoord::containing(enemy.position) else {
                continue;
            };
            let distance = cell.manhattan_distance(goal);
            if distance == 0 {
                continue;
            }
            let value = self.scores.for_kind(enemy.kind) as f32 / distance as f32;
            if best.map_or(true, |(top, _)| value > top) {
                best = Some((value, goal));
            }
        }
        let (_, goal) = best?;
        let action = self.navigate(state, cell, goal)?;

        if self.variant == AiVariant::Aggressive
            && self.rng.gen_bool(CHASE_FIRE_CHANCE)
            && self.fire_ready(CHASE_FIRE_COOLDOWN)
        {
            self.memory.last_fired = Some(self.clock);
            return Some(Action::Shoot);
        }
        Some(action)
    }

    fn cooperate(
        &mut self,
        state: &GameStateSnapshot,
        cell: CellCoord,
        teammate: &TeammateSnapshot,
    ) -> Option<Action> {
        let distance = state.position.distance(teammate.position);
        if distance > TEAM_SPREAD.1 {
            let goal = CellCoord::containing(teammate.position)?;
            return self.navigate(state, cell, goal);
        }
        if distance >= TEAM_SPREAD.0 {
            let shared = Action::toward(teammate.direction);
            let others: Vec<Action> = Action::MOVES
                .into_iter()
                .filter(|action| *action != shared)
                .collect();
            return others.choose(&mut self.rng).copied();
        }

        let dx = teammate.position.x - state.position.x;
        let dy = teammate.position.y - state.position.y;
        Some(if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Action::MoveLeft
            } else {
                Action::MoveRight
            }
        } else if dy > 0.0 {
            Action::MoveUp
        } else {
            Action::MoveDown
        })
    }

    fn explore(&mut self, state: &GameStateSnapshot, cell: CellCoord) -> Action {
        if self.memory.stuck_counter > WANDER_STUCK_LIMIT {
            if let Some(goal) = self.far_target(&state.layout, cell) {
                if let Some(action) = self.navigate(state, cell, goal) {
                    return action;
                }
            }
        }

        let maze = KnownMaze {
            layout: &state.layout,
            memory: &self.memory,
        };
        if maze.is_open(cell, state.direction) && self.rng.gen_bool(0.5) {
            return Action::toward(state.direction);
        }

        let mut open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| maze.is_open(cell, *direction))
            .collect();
        if open.len() > 1 {
            if let Some(back) = self.memory.last_action.and_then(Action::direction) {
                open.retain(|direction| *direction != back.opposite());
            }
        }
        let unexplored: Vec<Direction> = open
            .iter()
            .copied()
            .filter(|direction| {
                cell.neighbor(*direction)
                    .is_some_and(|next| !self.memory.has_visited(next))
            })
            .collect();
        let pool = if unexplored.is_empty() { open } else { unexplored };

        match pool.choose(&mut self.rng) {
            Some(direction) => Action::toward(*direction),
            None => Action::MOVES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(Action::NoAction),
        }
    }

    /// Random interior cell at least a few cells away, unvisited ones first.
    fn far_target(&mut self, layout: &MazeLayout, cell: CellCoord) -> Option<CellCoord> {
        let mut far = Vec::new();
        for row in 0..layout.height() {
            for column in 0..layout.width() {
                let candidate = CellCoord::new(column, row);
                let distant = candidate.column().abs_diff(cell.column()) > FAR_TARGET_CELLS
                    || candidate.row().abs_diff(cell.row()) > FAR_TARGET_CELLS;
                if distant && layout.is_interior(candidate) {
                    far.push(candidate);
                }
            }
        }
        let fresh: Vec<CellCoord> = far
            .iter()
            .copied()
            .filter(|candidate| !self.memory.has_visited(*candidate))
            .collect();
        let pool = if fresh.is_empty() { far } else { fresh };
        pool.choose(&mut self.rng).copied()
    }

    /// Next step toward `goal`, wandering randomly when no route exists.
    fn navigate(
        &mut self,
        state: &GameStateSnapshot,
        start: CellCoord,
        goal: CellCoord,
    ) -> Option<Action> {
        if start == goal {
            return None;
        }
        match self.route(state, start, goal) {
            Some(direction) => Some(Action::toward(direction)),
            None => Some(self.random_open_direction(state, start)),
        }
    }

    /// Follows the cached route, realigning or replanning when it went stale.
    fn route(
        &mut self,
        state: &GameStateSnapshot,
        start: CellCoord,
        goal: CellCoord,
    ) -> Option<Direction> {
        let mut stale =
            self.memory.current_goal != Some(goal) || self.memory.cached_path.is_empty();
        if !stale {
            let path = &mut self.memory.cached_path;
            if let Some(index) = path.iter().position(|cell| *cell == start) {
                let _ = path.drain(..=index);
            }
            stale = path
                .first()
                .map_or(true, |next| next.manhattan_distance(start) != 1);
        }

        if stale {
            let path = {
                let maze = KnownMaze {
                    layout: &state.layout,
                    memory: &self.memory,
                };
                find_path(Algorithm::AStar, &maze, start, goal)
            };
            if path.is_empty() {
                log::trace!(
                    "{:?} AI has no route to ({}, {})",
                    self.slot,
                    goal.column(),
                    goal.row()
                );
            }
            self.memory.cached_path = path;
            self.memory.current_goal = Some(goal);
        }

        let next = self.memory.cached_path.first()?;
        start.direction_to(*next)
    }

    fn random_open_direction(&mut self, state: &GameStateSnapshot, cell: CellCoord) -> Action {
        let maze = KnownMaze {
            layout: &state.layout,
            memory: &self.memory,
        };
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| maze.is_open(cell, *direction))
            .collect();
        match open.choose(&mut self.rng) {
            Some(direction) => Action::toward(*direction),
            None => Action::MOVES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(Action::NoAction),
        }
    }

    fn unstuck(&mut self) -> Action {
        match self.memory.last_action.and_then(Action::direction) {
            Some(direction) => Action::toward(direction.opposite()),
            None => Action::MOVES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(Action::NoAction),
        }
    }

    fn fire_ready(&self, cooldown: Duration) -> bool {
        self.memory
            .last_fired
            .map_or(true, |fired| self.clock.saturating_sub(fired) >= cooldown)
    }
}

/// Closest visible enemy sharing a row or column, with its bearing.
fn nearest_threat(state: &GameStateSnapshot) -> Option<(Direction, f32)> {
    state
        .enemies
        .iter()
        .filter(|enemy| enemy.visible)
        .filter_map(|enemy| {
            let dx = enemy.position.x - state.position.x;
            let dy = enemy.position.y - state.position.y;
            let direction = if dy.abs() < THREAT_ALIGNMENT {
                if dx > 0.0 {
                    Direction::East
                } else {
                    Direction::West
                }
            } else if dx.abs() < THREAT_ALIGNMENT {
                if dy > 0.0 {
                    Direction::South
                } else {
                    Direction::North
                }
            } else {
                return None;
            };
            Some((direction, state.position.distance(enemy.position)))
        })
        .min_by(|left, right| left.1.total_cmp(&right.1))
}

/// Whether stepping one cell in the direction of `action` keeps clear of enemies.
fn is_safe(state: &GameStateSnapshot, action: Action) -> bool {
    let Some(direction) = action.direction() else {
        return true;
    };
    let probe = state.position.offset(
        (direction.dx() * CELL_WIDTH) as f32,
        (direction.dy() * CELL_HEIGHT) as f32,
    );
    state
        .enemies
        .iter()
        .filter(|enemy| enemy.visible)
        .all(|enemy| enemy.position.distance(probe) >= SAFETY_RADIUS)
}

/// Whether the bullet will cross the player's position within the lookahead.
fn bullet_threatens(position: PixelPoint, velocity: PixelPoint, player: PixelPoint) -> bool {
    let future_x = position.x + velocity.x * BULLET_LOOKAHEAD_SECONDS;
    let future_y = position.y + velocity.y * BULLET_LOOKAHEAD_SECONDS;

    let horizontal = (position.y - player.y).abs() < BULLET_LANE
        && ((velocity.x > 0.0 && position.x < player.x && future_x >= player.x)
            || (velocity.x < 0.0 && position.x > player.x && future_x <= player.x));
    let vertical = (position.x - player.x).abs() < BULLET_LANE
        && ((velocity.y > 0.0 && position.y < player.y && future_y >= player.y)
            || (velocity.y < 0.0 && position.y > player.y && future_y <= player.y));
    horizontal || vertical
}

/// Whether no wall separates two positions sharing a grid row or column.
fn line_of_sight(layout: &MazeLayout, from: PixelPoint, to: PixelPoint) -> bool {
    let (Some(start), Some(end)) = (CellCoord::containing(from), CellCoord::containing(to)) else {
        return false;
    };
    let direction = if start == end {
        return true;
    } else if start.row() == end.row() {
        if end.column() > start.column() {
            Direction::East
        } else {
            Direction::West
        }
    } else if start.column() == end.column() {
        if end.row() > start.row() {
            Direction::South
        } else {
            Direction::North
        }
    } else {
        return false;
    };

    let mut cell = start;
    while cell != end {
        if !layout.is_open(cell, direction) {
            return false;
        }
        let Some(next) = cell.neighbor(direction) else {
            return false;
        };
        cell = next;
    }
    true
}
