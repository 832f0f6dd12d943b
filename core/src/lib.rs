#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Wizard Maze engine.
//!
//! This crate defines the message surface that connects the simulation loop,
//! the authoritative world, and the background workers. The loop submits
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! the loop reacts to. Workers never see the world itself: they receive
//! immutable snapshots ([`GameStateSnapshot`], [`PhysicsSnapshot`]) and answer
//! with [`Action`] values or a [`PhysicsResult`].

mod config;
mod layout;
mod snapshot;
mod worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, ConfigValue, EnemyCounts, GameConfig, ScoreTable, Tuning};
pub use layout::{
    bullet_hits, LayoutError, MazeLayout, WallMask, CELL_HEIGHT, CELL_WIDTH, SPRITE_PIVOT_X,
    SPRITE_PIVOT_Y,
};
pub use snapshot::{
    AudioCommand, BulletBody, BulletSnapshot, Collision, EnemyBody, EnemySnapshot,
    GameStateSnapshot, PhysicsResult, PhysicsSnapshot, PlayerBody, TeammateSnapshot,
    VolumeChannel,
};
pub use worker::{join_with_timeout, JoinOutcome, SpawnError};

/// Number of stages that make up a complete game.
pub const MAX_LEVELS: u32 = 10;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets players and scores and initialises the first stage.
    StartGame {
        /// Whether the second player slot takes part in the session.
        multiplayer: bool,
    },
    /// Abandons the running game without awarding a result.
    AbandonGame,
    /// Advances the camera-shake effect.
    DecayCameraShake {
        /// Simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Advances level clocks, phase sub-state timers and cage timers.
    AdvanceLevel {
        /// Simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Applies one accepted input sample to a player.
    SteerPlayer {
        /// Slot of the player being steered.
        slot: PlayerSlot,
        /// Buttons held or newly pressed during the frame.
        intent: PlayerIntent,
    },
    /// Runs direction picking, tunnel handling, movement and firing for every enemy.
    UpdateEnemies {
        /// Simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Kills any visible player touching an enemy.
    CheckPlayerContacts,
    /// Moves live bullets and discards the ones that left the inner walls.
    AdvanceBullets {
        /// Simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Applies a batch of collision records computed from an earlier snapshot.
    ApplyCollisions {
        /// Result produced by the collision resolver.
        result: PhysicsResult,
    },
    /// Kills an enemy outright and credits the optional killer.
    KillEnemy {
        /// Enemy to remove.
        enemy: EntityId,
        /// Player credited with the kill, if any.
        killer: Option<PlayerSlot>,
    },
    /// Ages the death animations.
    AgeDeathAnimations {
        /// Simulated time that elapsed since the previous frame.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A new game began.
    GameStarted {
        /// Whether two players take part.
        multiplayer: bool,
    },
    /// A stage was initialised and waits for its start delay.
    LevelInitialized {
        /// Zero-based stage index.
        stage: u32,
        /// Name of the maze used by the stage.
        level_name: String,
        /// Number of regular enemies that must die to clear the stage.
        enemies_to_kill: u32,
        /// Multiplier applied to kill scores during the stage.
        score_modifier: u32,
    },
    /// The start delay elapsed and the initial enemies entered the maze.
    LevelStarted {
        /// Zero-based stage index.
        stage: u32,
    },
    /// The level phase changed.
    PhaseChanged {
        /// Phase that was active before the transition.
        from: LevelPhase,
        /// Phase that became active.
        to: LevelPhase,
    },
    /// An enemy entered the maze.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EntityId,
        /// Variant of the enemy.
        kind: EnemyKind,
    },
    /// An enemy died.
    EnemyKilled {
        /// Identifier of the enemy.
        enemy: EntityId,
        /// Variant of the enemy.
        kind: EnemyKind,
        /// Player credited with the kill.
        killer: Option<PlayerSlot>,
        /// Points awarded to the killer.
        awarded: u32,
    },
    /// A player fired a bullet.
    PlayerFired {
        /// Slot of the shooter.
        slot: PlayerSlot,
    },
    /// An enemy fired the shared enemy bullet.
    EnemyFired {
        /// Identifier of the shooter.
        enemy: EntityId,
    },
    /// A player was killed.
    PlayerKilled {
        /// Slot of the victim.
        slot: PlayerSlot,
        /// Lives left after the loss.
        remaining_lives: i32,
    },
    /// A player re-entered its cage.
    PlayerCaged {
        /// Slot of the player.
        slot: PlayerSlot,
    },
    /// A player left its cage and entered the maze.
    PlayerLeftCage {
        /// Slot of the player.
        slot: PlayerSlot,
    },
    /// A player ran out of lives while the other player kept playing.
    PlayerEliminated {
        /// Slot of the player.
        slot: PlayerSlot,
    },
    /// A player crossed the extra-life score.
    ExtraLifeAwarded {
        /// Slot of the player.
        slot: PlayerSlot,
    },
    /// An enemy crossed a tunnel and reappeared on the mirror side.
    EnemyTunnelled {
        /// Identifier of the enemy.
        enemy: EntityId,
        /// Tunnel the enemy came out of.
        exit: TunnelSide,
    },
    /// The Wizard teleported.
    WizardTeleported {
        /// Identifier of the Wizard.
        enemy: EntityId,
    },
    /// The Worluk escaped through a tunnel.
    WorlukEscaped,
    /// Enemies became faster.
    SpeedIncreased {
        /// New global speed multiplier.
        level: f32,
    },
    /// All players ran out of lives.
    GameOver {
        /// Final scores per slot.
        scores: [Option<u32>; 2],
    },
    /// The last stage was cleared.
    GameCompleted {
        /// Final scores per slot.
        scores: [Option<u32>; 2],
    },
}

/// Buttons a player presses during one accepted input sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlayerIntent {
    /// Fire was pressed this frame and not on the previous one.
    pub fire_pressed: bool,
    /// Up is held.
    pub up: bool,
    /// Down is held.
    pub down: bool,
    /// Left is held.
    pub left: bool,
    /// Right is held.
    pub right: bool,
}

impl PlayerIntent {
    /// Reports whether any movement button is held.
    #[must_use]
    pub const fn any_move(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Reports whether no button is involved at all.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.fire_pressed && !self.any_move()
    }

    /// Intent derived from two consecutive button samples.
    ///
    /// Movement follows the held state while fire only counts on the frame
    /// it goes down.
    #[must_use]
    pub const fn from_samples(previous: Buttons, current: Buttons) -> Self {
        Self {
            fire_pressed: current.fire && !previous.fire,
            up: current.up,
            down: current.down,
            left: current.left,
            right: current.right,
        }
    }
}

/// Raw state of one player's buttons during a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buttons {
    /// Up is down.
    pub up: bool,
    /// Down is down.
    pub down: bool,
    /// Left is down.
    pub left: bool,
    /// Right is down.
    pub right: bool,
    /// Fire is down.
    pub fire: bool,
}

impl Buttons {
    /// Presses the button matching an AI action.
    pub fn press(&mut self, action: Action) {
        match action {
            Action::MoveUp => self.up = true,
            Action::MoveDown => self.down = true,
            Action::MoveLeft => self.left = true,
            Action::MoveRight => self.right = true,
            Action::Shoot => self.fire = true,
            Action::NoAction => {}
        }
    }

    /// Reports whether any button is down.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.up || self.down || self.left || self.right || self.fire
    }
}

/// Cardinal movement directions. Declaration order is the search order used
/// across the engine: up, right, down, left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in search order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Horizontal component of the unit vector.
    #[must_use]
    pub const fn dx(self) -> i32 {
        match self {
            Direction::East => 1,
            Direction::West => -1,
            Direction::North | Direction::South => 0,
        }
    }

    /// Vertical component of the unit vector.
    #[must_use]
    pub const fn dy(self) -> i32 {
        match self {
            Direction::South => 1,
            Direction::North => -1,
            Direction::East | Direction::West => 0,
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Reports whether the direction runs along a row.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// Resolves a unit step back into a direction.
    #[must_use]
    pub const fn from_delta(dx: i64, dy: i64) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring cell in the provided direction, if it has non-negative indices.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(direction.dx())?;
        let row = self.row.checked_add_signed(direction.dy())?;
        Some(CellCoord::new(column, row))
    }

    /// Direction leading from `self` to an adjacent `other`.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Option<Direction> {
        let dx = i64::from(other.column) - i64::from(self.column);
        let dy = i64::from(other.row) - i64::from(self.row);
        Direction::from_delta(dx, dy)
    }

    /// Cell containing the provided pixel position, if it lies at non-negative coordinates.
    #[must_use]
    pub fn containing(point: PixelPoint) -> Option<CellCoord> {
        let column = point.pixel_x().div_euclid(CELL_WIDTH);
        let row = point.pixel_y().div_euclid(CELL_HEIGHT);
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }

    /// Pixel position of the cell's upper-left corner.
    #[must_use]
    pub fn top_left(self) -> PixelPoint {
        PixelPoint::new(
            self.column as f32 * CELL_WIDTH as f32,
            self.row as f32 * CELL_HEIGHT as f32,
        )
    }
}

/// Sub-pixel position measured in maze pixels from the upper-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl PixelPoint {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Whole-pixel horizontal coordinate (floored).
    #[must_use]
    pub fn pixel_x(&self) -> i32 {
        self.x.floor() as i32
    }

    /// Whole-pixel vertical coordinate (floored).
    #[must_use]
    pub fn pixel_y(&self) -> i32 {
        self.y.floor() as i32
    }

    /// Position translated by the provided offsets.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: PixelPoint) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Visual tint applied to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint {
    red: u8,
    green: u8,
    blue: u8,
}

impl Tint {
    /// Creates a new tint from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the tint.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the tint.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the tint.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// One of the two player slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerSlot {
    /// First player, caged on the right.
    One,
    /// Second player, caged on the left.
    Two,
}

impl PlayerSlot {
    /// Both slots in order.
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    /// Array index of the slot.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// The other slot.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    /// Cell of the slot's cage.
    #[must_use]
    pub const fn cage(self) -> CellCoord {
        match self {
            PlayerSlot::One => CellCoord::new(11, 7),
            PlayerSlot::Two => CellCoord::new(1, 7),
        }
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to every fired bullet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BulletId(u64);

impl BulletId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Entity that fired a bullet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shooter {
    /// Bullet fired by a player.
    Player(PlayerSlot),
    /// The shared enemy bullet, fired by the identified enemy.
    Enemy(EntityId),
}

/// What a bullet may hit besides walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Only players.
    Player,
    /// Players and enemies.
    Any,
}

/// Variants of enemies roaming the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Basic enemy present from the first stage.
    Burwor,
    /// Reinforcement that may turn invisible.
    Garwor,
    /// Stronger reinforcement that may turn invisible.
    Thorwor,
    /// Fast boss that tries to escape through a tunnel.
    Worluk,
    /// Teleporting boss.
    Wizard,
}

impl EnemyKind {
    /// Reports whether the kind is one of the two boss variants.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, EnemyKind::Worluk | EnemyKind::Wizard)
    }
}

/// One of the two mirrored tunnels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TunnelSide {
    /// Tunnel on the left edge of the maze.
    Left,
    /// Tunnel on the right edge of the maze.
    Right,
}

impl TunnelSide {
    /// Tunnel on the opposite edge.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            TunnelSide::Left => TunnelSide::Right,
            TunnelSide::Right => TunnelSide::Left,
        }
    }

    /// Direction that carries an entity into this tunnel.
    #[must_use]
    pub const fn exit_direction(self) -> Direction {
        match self {
            TunnelSide::Left => Direction::West,
            TunnelSide::Right => Direction::East,
        }
    }
}

/// Sub-objective of the active stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelPhase {
    /// Regular enemies must be cleared.
    KillEnemies,
    /// The Worluk roams the maze.
    Worluk,
    /// The Wizard roams the maze.
    Wizard,
    /// Timed celebration after the Worluk died.
    WorlukDeath,
    /// Timed celebration after the Wizard died.
    WizardDeath,
    /// Timed sub-state after the Worluk escaped.
    WorlukEscape,
}

impl LevelPhase {
    /// Reports whether the phase is one of the timed sub-states.
    #[must_use]
    pub const fn is_timed(self) -> bool {
        matches!(
            self,
            LevelPhase::WorlukDeath | LevelPhase::WizardDeath | LevelPhase::WorlukEscape
        )
    }
}

/// Decision produced by an AI instance for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Hold the up button.
    MoveUp,
    /// Hold the down button.
    MoveDown,
    /// Hold the left button.
    MoveLeft,
    /// Hold the right button.
    MoveRight,
    /// Press fire.
    Shoot,
    /// Release everything.
    NoAction,
}

impl Action {
    /// The four movement actions in search order.
    pub const MOVES: [Action; 4] = [
        Action::MoveUp,
        Action::MoveRight,
        Action::MoveDown,
        Action::MoveLeft,
    ];

    /// Movement action heading in the provided direction.
    #[must_use]
    pub const fn toward(direction: Direction) -> Self {
        match direction {
            Direction::North => Action::MoveUp,
            Direction::East => Action::MoveRight,
            Direction::South => Action::MoveDown,
            Direction::West => Action::MoveLeft,
        }
    }

    /// Direction of a movement action.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Action::MoveUp => Some(Direction::North),
            Action::MoveRight => Some(Direction::East),
            Action::MoveDown => Some(Direction::South),
            Action::MoveLeft => Some(Direction::West),
            Action::Shoot | Action::NoAction => None,
        }
    }

    /// Reports whether the action moves the player.
    #[must_use]
    pub const fn is_move(self) -> bool {
        self.direction().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Action, Buttons, CellCoord, Direction, EntityId, LevelPhase, PixelPoint, PlayerIntent,
        Shooter,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn neighbor_refuses_negative_indices() {
        let corner = CellCoord::new(0, 0);
        assert_eq!(corner.neighbor(Direction::North), None);
        assert_eq!(corner.neighbor(Direction::West), None);
        assert_eq!(corner.neighbor(Direction::East), Some(CellCoord::new(1, 0)));
    }

    #[test]
    fn containing_cell_uses_floored_pixels() {
        let point = PixelPoint::new(23.9, 19.99);
        assert_eq!(CellCoord::containing(point), Some(CellCoord::new(1, 1)));
        assert_eq!(CellCoord::containing(PixelPoint::new(-0.5, 3.0)), None);
    }

    #[test]
    fn actions_and_directions_agree() {
        for direction in Direction::ALL {
            assert_eq!(Action::toward(direction).direction(), Some(direction));
        }
        assert!(!Action::Shoot.is_move());
    }

    #[test]
    fn fire_counts_only_on_the_press_edge() {
        let mut held = Buttons::default();
        held.press(Action::Shoot);
        held.press(Action::MoveLeft);

        let first = PlayerIntent::from_samples(Buttons::default(), held);
        assert!(first.fire_pressed && first.left);
        let repeat = PlayerIntent::from_samples(held, held);
        assert!(!repeat.fire_pressed, "holding fire must not re-trigger");
        assert!(repeat.left, "movement follows the held state");
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn contracts_round_trip_through_bincode() {
        assert_round_trip(&Shooter::Enemy(EntityId::new(9)));
        assert_round_trip(&LevelPhase::WorlukEscape);
        assert_round_trip(&Action::MoveLeft);
    }
}
