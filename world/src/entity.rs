use wizard_maze_core::{
    BulletId, CellCoord, Direction, EnemyKind, EntityId, PixelPoint, PlayerSlot, Shooter, TargetType, Tint,
    CELL_HEIGHT, CELL_WIDTH, SPRITE_PIVOT_X, SPRITE_PIVOT_Y,
};

use crate::level::Steering;

/// Seconds a visible invisibility-capable enemy stays visible.
pub const INVISIBILITY_DELAY: f32 = 2.0;

/// Speed of the Worluk, which ignores the difficulty threshold.
pub const WORLUK_SPEED: f32 = 100.0;

/// Pixels the Wizard glides per tick.
pub const WIZARD_STEP: f32 = 0.2;

const ENEMY_BASE_STEP: f32 = 0.4;
const ENEMY_REFERENCE_SPEED: f32 = 40.0;
const ENEMY_MIN_STEP: f32 = 0.25;
const ENEMY_MAX_STEP: f32 = 0.8;
const WALK_FRAME_COUNT: f32 = 4.0;
const MAZE_CENTRE_COLUMN: u32 = 5;

/// Projectile fired by a player or by the enemy side.
#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    id: BulletId,
    shooter: Shooter,
    position: PixelPoint,
    velocity: PixelPoint,
    target: TargetType,
}

impl Bullet {
    pub(crate) fn fire(
        id: BulletId,
        shooter: Shooter,
        origin: PixelPoint,
        direction: Direction,
        speed: f32,
        target: TargetType,
    ) -> Self {
        Self {
            id,
            shooter,
            position: origin.offset(SPRITE_PIVOT_X, SPRITE_PIVOT_Y),
            velocity: PixelPoint::new(direction.dx() as f32 * speed, direction.dy() as f32 * speed),
            target,
        }
    }

    /// Identifier of the bullet.
    #[must_use]
    pub const fn id(&self) -> BulletId {
        self.id
    }

    /// Entity that fired the bullet.
    #[must_use]
    pub const fn shooter(&self) -> Shooter {
        self.shooter
    }

    /// Sub-pixel position.
    #[must_use]
    pub const fn position(&self) -> PixelPoint {
        self.position
    }

    /// Displacement per second.
    #[must_use]
    pub const fn velocity(&self) -> PixelPoint {
        self.velocity
    }

    /// What the bullet may hit.
    #[must_use]
    pub const fn target(&self) -> TargetType {
        self.target
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.position = self
            .position
            .offset(self.velocity.x * dt, self.velocity.y * dt);
    }
}

/// The single enemy bullet allowed in the maze at any time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnemyBulletSlot {
    bullet: Option<Bullet>,
}

impl EnemyBulletSlot {
    /// Whether an enemy bullet is in flight.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.bullet.is_some()
    }

    /// Enemy owning the bullet in flight.
    #[must_use]
    pub fn owner(&self) -> Option<EntityId> {
        match self.bullet.as_ref()?.shooter() {
            Shooter::Enemy(id) => Some(id),
            Shooter::Player(_) => None,
        }
    }

    /// Bullet in flight.
    #[must_use]
    pub const fn bullet(&self) -> Option<&Bullet> {
        self.bullet.as_ref()
    }

    pub(crate) fn bullet_mut(&mut self) -> Option<&mut Bullet> {
        self.bullet.as_mut()
    }

    /// Stores the bullet built by `fire` unless one is already in flight.
    pub(crate) fn try_fire(&mut self, fire: impl FnOnce() -> Bullet) -> bool {
        if self.bullet.is_some() {
            return false;
        }
        self.bullet = Some(fire());
        true
    }

    pub(crate) fn clear(&mut self) {
        self.bullet = None;
    }
}

/// State carried only by players.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    slot: PlayerSlot,
    lives: i32,
    score: u32,
    extra_life_score: u32,
    pub(crate) in_cage: bool,
    pub(crate) time_in_cage: f32,
    pub(crate) time_to_cage: f32,
    pub(crate) bullet: Option<Bullet>,
}

impl PlayerState {
    /// Slot of the player.
    #[must_use]
    pub const fn slot(&self) -> PlayerSlot {
        self.slot
    }

    /// Remaining lives; the player is still in the game while this is non-negative.
    #[must_use]
    pub const fn lives(&self) -> i32 {
        self.lives
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Whether the player waits in its cage.
    #[must_use]
    pub const fn in_cage(&self) -> bool {
        self.in_cage
    }

    /// Bullet fired by the player, if still in flight.
    #[must_use]
    pub const fn bullet(&self) -> Option<&Bullet> {
        self.bullet.as_ref()
    }

    /// Whether the player has not yet run out of lives.
    #[must_use]
    pub const fn has_lives_left(&self) -> bool {
        self.lives >= 0
    }

    pub(crate) fn lose_life(&mut self) {
        self.lives -= 1;
    }

    /// Adds points; returns whether the extra-life score was crossed.
    pub(crate) fn increase_score(&mut self, points: u32) -> bool {
        let crossed =
            self.score < self.extra_life_score && self.score + points >= self.extra_life_score;
        if crossed {
            self.lives += 1;
        }
        self.score += points;
        crossed
    }

    /// Keeps the bullet built by `fire` unless one is already in flight.
    pub(crate) fn try_fire(&mut self, fire: impl FnOnce() -> Bullet) -> bool {
        if self.bullet.is_some() {
            return false;
        }
        self.bullet = Some(fire());
        true
    }
}

/// State shared by every enemy variant.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyState {
    id: EntityId,
    kind: EnemyKind,
    score: u32,
    pub(crate) can_fire: bool,
    pub(crate) can_become_invisible: bool,
    pub(crate) visibility_timer: f32,
    pub(crate) steering: Steering,
}

impl EnemyState {
    pub(crate) const fn new(id: EntityId, kind: EnemyKind, score: u32, steering: Steering) -> Self {
        Self {
            id,
            kind,
            score,
            can_fire: false,
            can_become_invisible: false,
            visibility_timer: 0.0,
            steering,
        }
    }

    /// Identifier of the enemy.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Variant of the enemy.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Points awarded for the kill before the score modifier.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Whether the enemy may fire at players.
    #[must_use]
    pub const fn can_fire(&self) -> bool {
        self.can_fire
    }

    /// Whether the enemy fades out after a while.
    #[must_use]
    pub const fn can_become_invisible(&self) -> bool {
        self.can_become_invisible
    }
}

/// Teleport clock of the Wizard.
#[derive(Clone, Debug, PartialEq)]
pub struct TeleportClock {
    pub(crate) timer: f32,
    pub(crate) cooldown: f32,
}

/// Capability set selected when an entity is created.
#[derive(Clone, Debug, PartialEq)]
pub enum Behavior {
    /// Human or AI controlled player moving a full cell per step.
    Player(PlayerState),
    /// Burwor, Garwor or Thorwor roaming the corridors.
    Enemy(EnemyState),
    /// Fast boss seeking a tunnel.
    Worluk(EnemyState),
    /// Teleporting boss gliding within its validity bounds.
    Wizard(EnemyState, TeleportClock),
}

/// Character present in the maze.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    position: PixelPoint,
    direction: Direction,
    enabled: bool,
    visible: bool,
    tint: Tint,
    frame: f32,
    speed: f32,
    behavior: Behavior,
}

impl Entity {
    pub(crate) fn player(slot: PlayerSlot, lives: i32, extra_life_score: u32, tint: Tint) -> Self {
        Self {
            position: slot.cage().top_left(),
            direction: Direction::West,
            enabled: true,
            visible: true,
            tint,
            frame: 0.0,
            speed: 0.0,
            behavior: Behavior::Player(PlayerState {
                slot,
                lives,
                score: 0,
                extra_life_score,
                in_cage: false,
                time_in_cage: 0.0,
                time_to_cage: 0.0,
                bullet: None,
            }),
        }
    }

    pub(crate) fn with_behavior(
        behavior: Behavior,
        position: PixelPoint,
        direction: Direction,
        tint: Tint,
        speed: f32,
    ) -> Self {
        Self {
            position,
            direction,
            enabled: true,
            visible: true,
            tint,
            frame: 0.0,
            speed,
            behavior,
        }
    }

    /// Sub-pixel position.
    #[must_use]
    pub const fn position(&self) -> PixelPoint {
        self.position
    }

    /// Facing and travel direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the entity still takes part in the game.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the entity is visible and can be hit.
    #[must_use]
    pub const fn visible(&self) -> bool {
        self.visible
    }

    /// Tint of the entity.
    #[must_use]
    pub const fn tint(&self) -> Tint {
        self.tint
    }

    /// Animation frame to display.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame.floor() as u32
    }

    /// Current movement speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Capability set of the entity.
    #[must_use]
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Player state, when the entity is a player.
    #[must_use]
    pub const fn player_state(&self) -> Option<&PlayerState> {
        match &self.behavior {
            Behavior::Player(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn player_state_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.behavior {
            Behavior::Player(state) => Some(state),
            _ => None,
        }
    }

    /// Enemy state, when the entity is an enemy of any variant.
    #[must_use]
    pub const fn enemy_state(&self) -> Option<&EnemyState> {
        match &self.behavior {
            Behavior::Enemy(state) | Behavior::Worluk(state) | Behavior::Wizard(state, _) => {
                Some(state)
            }
            Behavior::Player(_) => None,
        }
    }

    pub(crate) fn enemy_state_mut(&mut self) -> Option<&mut EnemyState> {
        match &mut self.behavior {
            Behavior::Enemy(state) | Behavior::Worluk(state) | Behavior::Wizard(state, _) => {
                Some(state)
            }
            Behavior::Player(_) => None,
        }
    }

    pub(crate) fn teleport_clock_mut(&mut self) -> Option<&mut TeleportClock> {
        match &mut self.behavior {
            Behavior::Wizard(_, clock) => Some(clock),
            _ => None,
        }
    }

    /// Identifier of the enemy, if the entity is one.
    #[must_use]
    pub fn enemy_id(&self) -> Option<EntityId> {
        self.enemy_state().map(EnemyState::id)
    }

    /// Variant of the enemy, if the entity is one.
    #[must_use]
    pub fn enemy_kind(&self) -> Option<EnemyKind> {
        self.enemy_state().map(EnemyState::kind)
    }

    /// Whether the entity is the Wizard.
    #[must_use]
    pub const fn is_wizard(&self) -> bool {
        matches!(self.behavior, Behavior::Wizard(..))
    }

    /// Whether the entity is the Worluk.
    #[must_use]
    pub const fn is_worluk(&self) -> bool {
        matches!(self.behavior, Behavior::Worluk(_))
    }

    pub(crate) fn move_to(&mut self, position: PixelPoint) {
        self.position = position;
    }

    pub(crate) fn look(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        if visible {
            if let Some(enemy) = self.enemy_state_mut() {
                enemy.visibility_timer = 0.0;
            }
        }
        self.visible = visible;
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
        self.visible = false;
    }

    /// Moves the entity one tick in its direction, according to its behavior.
    ///
    /// Players snap a full cell; enemies glide a speed-scaled fraction of a
    /// pixel; the Wizard glides a fixed fraction and must validate the target
    /// itself before calling this.
    pub(crate) fn advance(&mut self) {
        let (dx, dy) = (self.direction.dx() as f32, self.direction.dy() as f32);
        let (step_x, step_y) = match self.behavior {
            Behavior::Player(_) => (CELL_WIDTH as f32, CELL_HEIGHT as f32),
            Behavior::Enemy(_) | Behavior::Worluk(_) => {
                let step = enemy_step(self.speed);
                (step, step)
            }
            Behavior::Wizard(..) => (WIZARD_STEP, WIZARD_STEP),
        };
        self.position = self.position.offset(dx * step_x, dy * step_y);
    }

    pub(crate) fn animate(&mut self, dt: f32) {
        self.frame += dt * self.speed;
        if self.frame >= WALK_FRAME_COUNT {
            self.frame = 0.0;
        }
    }

    /// Places a player in its cage, facing the maze centre.
    pub(crate) fn enter_cage(&mut self) {
        let cage = match self.player_state_mut() {
            Some(state) => {
                state.in_cage = true;
                state.time_in_cage = 0.0;
                state.time_to_cage = 0.0;
                state.slot().cage()
            }
            None => return,
        };
        self.position = cage.top_left();
        self.direction = if cage.column() <= MAZE_CENTRE_COLUMN {
            Direction::East
        } else {
            Direction::West
        };
        self.visible = true;
    }

    /// Moves a caged player to the cell above its cage.
    pub(crate) fn leave_cage(&mut self) {
        let cage = match self.player_state_mut() {
            Some(state) if state.in_cage => {
                state.in_cage = false;
                state.slot().cage()
            }
            _ => return,
        };
        self.position = CellCoord::new(cage.column(), cage.row().saturating_sub(1)).top_left();
    }

    /// Counts down visibility for invisibility-capable enemies.
    pub(crate) fn tick_visibility(&mut self, dt: f32) {
        let visible = self.visible;
        let Some(enemy) = self.enemy_state_mut() else {
            return;
        };
        if enemy.can_become_invisible && visible {
            enemy.visibility_timer += dt;
            if enemy.visibility_timer >= INVISIBILITY_DELAY {
                self.visible = false;
            }
        }
    }

    /// Reveals a hidden enemy sharing a pixel row or column with the player.
    pub(crate) fn reveal_if_aligned(&mut self, player: &Entity) {
        if self.visible {
            return;
        }
        if self.position.pixel_y() == player.position.pixel_y()
            || self.position.pixel_x() == player.position.pixel_x()
        {
            self.set_visible(true);
        }
    }

    /// Whether the enemy has a clear reason to fire at the player.
    ///
    /// Requires the player to be visible and out of its cage, no enemy
    /// bullet in flight, and the player lying ahead on the enemy's row or
    /// column.
    #[must_use]
    pub fn can_fire_at(&self, player: &Entity, enemy_bullet_live: bool) -> bool {
        let Some(enemy) = self.enemy_state() else {
            return false;
        };
        let Some(target) = player.player_state() else {
            return false;
        };
        if !enemy.can_fire || target.in_cage || !player.visible || enemy_bullet_live {
            return false;
        }

        let (x, y) = (self.position.pixel_x(), self.position.pixel_y());
        let (px, py) = (player.position.pixel_x(), player.position.pixel_y());
        if self.direction.is_horizontal() {
            y == py && self.direction.dx() == sign(px - x)
        } else {
            x == px && self.direction.dy() == sign(py - y)
        }
    }
}

/// Fractional pixels an enemy glides per tick at the provided speed.
#[must_use]
pub fn enemy_step(speed: f32) -> f32 {
    if speed > 0.0 {
        (ENEMY_BASE_STEP * speed / ENEMY_REFERENCE_SPEED).clamp(ENEMY_MIN_STEP, ENEMY_MAX_STEP)
    } else {
        ENEMY_BASE_STEP
    }
}

const fn sign(value: i32) -> i32 {
    if value >= 0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::{enemy_step, Behavior, Bullet, EnemyBulletSlot, EnemyState, Entity};
    use crate::level::Steering;
    use wizard_maze_core::{
        BulletId, Direction, EnemyKind, EntityId, PixelPoint, PlayerSlot, Shooter, TargetType,
        Tint,
    };

    fn bullet(id: u64, shooter: Shooter) -> Bullet {
        Bullet::fire(
            BulletId::new(id),
            shooter,
            PixelPoint::new(24.0, 20.0),
            Direction::East,
            100.0,
            TargetType::Player,
        )
    }

    fn burwor(id: u32, position: PixelPoint, direction: Direction) -> Entity {
        let mut state = EnemyState::new(EntityId::new(id), EnemyKind::Burwor, 100, Steering::free());
        state.can_fire = true;
        Entity::with_behavior(
            Behavior::Enemy(state),
            position,
            direction,
            Tint::from_rgb(0, 0, 255),
            25.0,
        )
    }

    fn free_player(position: PixelPoint) -> Entity {
        let mut player = Entity::player(PlayerSlot::One, 3, 10_000, Tint::from_rgb(255, 255, 0));
        player.move_to(position);
        player
    }

    #[test]
    fn player_fire_keeps_the_live_bullet() {
        let mut player = free_player(PixelPoint::new(24.0, 20.0));
        let state = player.player_state_mut().expect("player state");
        assert!(state.try_fire(|| bullet(1, Shooter::Player(PlayerSlot::One))));
        assert!(!state.try_fire(|| bullet(2, Shooter::Player(PlayerSlot::One))));
        assert_eq!(state.bullet().map(Bullet::id), Some(BulletId::new(1)));
    }

    #[test]
    fn enemy_slot_holds_a_single_owner() {
        let mut slot = EnemyBulletSlot::default();
        assert!(slot.try_fire(|| bullet(1, Shooter::Enemy(EntityId::new(4)))));
        assert!(!slot.try_fire(|| bullet(2, Shooter::Enemy(EntityId::new(5)))));
        assert_eq!(slot.owner(), Some(EntityId::new(4)));
        slot.clear();
        assert!(!slot.is_live());
    }

    #[test]
    fn bullets_spawn_at_the_pivot_and_travel() {
        let mut shot = bullet(1, Shooter::Enemy(EntityId::new(1)));
        assert_eq!(shot.position(), PixelPoint::new(28.0, 24.0));
        shot.advance(0.5);
        assert_eq!(shot.position(), PixelPoint::new(78.0, 24.0));
    }

    #[test]
    fn enemies_fire_only_at_aligned_players_ahead() {
        let enemy = burwor(1, PixelPoint::new(24.0, 30.0), Direction::East);
        let ahead = free_player(PixelPoint::new(60.0, 30.0));
        let behind = free_player(PixelPoint::new(12.0, 30.0));
        let other_row = free_player(PixelPoint::new(60.0, 40.0));
        assert!(enemy.can_fire_at(&ahead, false));
        assert!(!enemy.can_fire_at(&ahead, true), "enemy bullet already in flight");
        assert!(!enemy.can_fire_at(&behind, false));
        assert!(!enemy.can_fire_at(&other_row, false));
    }

    #[test]
    fn invisible_enemies_reappear_when_aligned() {
        let mut enemy = burwor(1, PixelPoint::new(24.0, 30.0), Direction::East);
        enemy
            .enemy_state_mut()
            .expect("enemy state")
            .can_become_invisible = true;
        enemy.tick_visibility(2.0);
        assert!(!enemy.visible());
        enemy.reveal_if_aligned(&free_player(PixelPoint::new(84.0, 50.0)));
        assert!(!enemy.visible());
        enemy.reveal_if_aligned(&free_player(PixelPoint::new(24.0, 50.0)));
        assert!(enemy.visible());
    }

    #[test]
    fn enemy_step_is_speed_scaled_and_clamped() {
        assert_eq!(enemy_step(40.0), 0.4);
        assert_eq!(enemy_step(10.0), 0.25);
        assert_eq!(enemy_step(500.0), 0.8);
    }

    #[test]
    fn cage_entry_faces_the_maze_centre() {
        let mut player = free_player(PixelPoint::new(60.0, 30.0));
        player.enter_cage();
        assert_eq!(player.position(), PixelPoint::new(132.0, 70.0));
        assert_eq!(player.direction(), Direction::West);
        assert!(player.player_state().is_some_and(|state| state.in_cage()));
        player.leave_cage();
        assert_eq!(player.position(), PixelPoint::new(132.0, 60.0));
    }

    #[test]
    fn players_snap_a_full_cell() {
        let mut player = free_player(PixelPoint::new(24.0, 20.0));
        player.look(Direction::South);
        player.advance();
        assert_eq!(player.position(), PixelPoint::new(24.0, 30.0));
    }
}
