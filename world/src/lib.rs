#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Wizard Maze.
//!
//! The world owns every player, enemy and bullet together with the level
//! phase machine. Systems never touch it directly: they emit [`Command`]
//! values that [`apply`] executes, and observe the [`Event`] values it
//! broadcasts in return.

mod effects;
mod entity;
mod level;
mod loader;

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wizard_maze_core::{
    BulletId, Collision, Command, Direction, EnemyCounts, EnemyKind, EntityId, Event, LevelPhase,
    MazeLayout, PhysicsResult, PlayerIntent, PlayerSlot, Shooter, TargetType, Tint, Tuning,
    MAX_LEVELS,
};

pub use effects::{CameraShake, DeathAnimation, DEATH_ANIMATION_SPEED, DEATH_FRAME_COUNT};
pub use entity::{
    enemy_step, Behavior, Bullet, EnemyBulletSlot, EnemyState, Entity, PlayerState,
    TeleportClock, INVISIBILITY_DELAY, WIZARD_STEP, WORLUK_SPEED,
};
pub use level::{
    GridLevel, MoveOptions, Steering, MAX_THRESHOLD, THRESHOLD_PERIOD, TUNNEL_PERIOD, TUNNEL_ROW,
};
pub use loader::{
    load_level, load_level_or_fallback, load_levels_from_dir, parse_level, LevelLoadError,
};

const LEVEL_START_DELAY: f32 = 1.5;
const DEATH_PHASE_DURATION: f32 = 1.0;
const ESCAPE_PHASE_DURATION: f32 = 0.8;
const CAGE_DELAY: f32 = 1.0;
const SPEED_INTERVAL: f32 = 15.0;
const SPEED_INCREMENT: f32 = 0.2;
const MAX_SPEED_LEVEL: f32 = 3.0;
const CONTACT_DISTANCE: i32 = 2;

const PLAYER_ONE_TINT: Tint = Tint::from_rgb(0xff, 0xd7, 0x00);
const PLAYER_TWO_TINT: Tint = Tint::from_rgb(0x3d, 0x8b, 0xff);
const BURWOR_TINT: Tint = Tint::from_rgb(0x2f, 0x6f, 0xff);
const GARWOR_TINT: Tint = Tint::from_rgb(0xff, 0xc1, 0x07);
const THORWOR_TINT: Tint = Tint::from_rgb(0xc8, 0x2a, 0x36);
const WIZARD_TINT: Tint = Tint::from_rgb(0xff, 0xff, 0xff);

/// Lifecycle of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// No game has been started or the last one was abandoned.
    Idle,
    /// A game is in progress.
    Running,
    /// Every player ran out of lives.
    Over,
    /// The last stage was cleared.
    Completed,
}

/// Represents the authoritative Wizard Maze world state.
#[derive(Debug)]
pub struct World {
    levels: Vec<Arc<MazeLayout>>,
    level: GridLevel,
    tuning: Tuning,
    rng: ChaCha8Rng,
    status: GameStatus,
    multiplayer: bool,
    players: [Option<Entity>; 2],
    enemies: Vec<Entity>,
    enemy_bullet: EnemyBulletSlot,
    deaths: Vec<DeathAnimation>,
    shake: CameraShake,
    stage: u32,
    phase: LevelPhase,
    phase_timer: f32,
    level_starting: bool,
    level_start_timer: f32,
    pending: EnemyCounts,
    kill_count: u32,
    enemies_to_kill: u32,
    score_modifier: u32,
    apply_double_score: bool,
    speed_level: f32,
    speed_timer: f32,
    next_enemy: u32,
    next_bullet: u64,
}

impl World {
    /// Creates a world over the provided stage layouts.
    ///
    /// Stages cycle through the layouts; an empty list falls back to the open
    /// grid. The seed drives every random decision taken by the world.
    #[must_use]
    pub fn new(levels: Vec<MazeLayout>, tuning: Tuning, seed: u64) -> Self {
        let mut levels: Vec<Arc<MazeLayout>> = levels.into_iter().map(Arc::new).collect();
        if levels.is_empty() {
            log::warn!("no level layouts supplied; using the fallback maze");
            levels.push(Arc::new(MazeLayout::fallback()));
        }
        let level = GridLevel::new(Arc::clone(&levels[0]));
        let shake = CameraShake::new(tuning.camera_shake);

        Self {
            levels,
            level,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            status: GameStatus::Idle,
            multiplayer: false,
            players: [None, None],
            enemies: Vec::new(),
            enemy_bullet: EnemyBulletSlot::default(),
            deaths: Vec::new(),
            shake,
            stage: 0,
            phase: LevelPhase::KillEnemies,
            phase_timer: 0.0,
            level_starting: false,
            level_start_timer: 0.0,
            pending: EnemyCounts::default(),
            kill_count: 0,
            enemies_to_kill: 0,
            score_modifier: 1,
            apply_double_score: false,
            speed_level: 1.0,
            speed_timer: 0.0,
            next_enemy: 0,
            next_bullet: 0,
        }
    }

    fn is_playing(&self) -> bool {
        self.status == GameStatus::Running && !self.level_starting && !self.phase.is_timed()
    }

    fn allocate_enemy_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_enemy);
        self.next_enemy = self.next_enemy.wrapping_add(1);
        id
    }

    fn scores(&self) -> [Option<u32>; 2] {
        PlayerSlot::ALL.map(|slot| {
            self.players[slot.index()]
                .as_ref()
                .and_then(Entity::player_state)
                .map(PlayerState::score)
        })
    }

    fn any_player_alive(&self) -> bool {
        self.players
            .iter()
            .flatten()
            .filter_map(Entity::player_state)
            .any(PlayerState::has_lives_left)
    }

    fn set_phase(&mut self, phase: LevelPhase, out_events: &mut Vec<Event>) {
        if self.phase == phase {
            return;
        }
        log::debug!("level phase {:?} -> {:?}", self.phase, phase);
        out_events.push(Event::PhaseChanged {
            from: self.phase,
            to: phase,
        });
        self.phase = phase;
        self.phase_timer = 0.0;
    }

    fn start_game(&mut self, multiplayer: bool, out_events: &mut Vec<Event>) {
        self.clear_level();
        self.deaths.clear();
        let lives = self.tuning.player_max_lives;
        let extra_life = self.tuning.scores.extra_life;
        self.players = [
            Some(Entity::player(PlayerSlot::One, lives, extra_life, PLAYER_ONE_TINT)),
            multiplayer.then(|| Entity::player(PlayerSlot::Two, lives, extra_life, PLAYER_TWO_TINT)),
        ];
        self.multiplayer = multiplayer;
        self.status = GameStatus::Running;
        self.stage = 0;
        self.apply_double_score = false;
        self.shake = CameraShake::new(self.tuning.camera_shake);
        log::info!("starting a {} game", if multiplayer { "two-player" } else { "single-player" });
        out_events.push(Event::GameStarted { multiplayer });
        self.init_level(out_events);
    }

    fn init_level(&mut self, out_events: &mut Vec<Event>) {
        if self.stage >= MAX_LEVELS {
            self.complete_game(out_events);
            return;
        }
        let index = usize::try_from(self.stage).unwrap_or(0) % self.levels.len();
        self.level = GridLevel::new(Arc::clone(&self.levels[index]));
        self.level.reset(self.stage);
        self.set_phase(LevelPhase::KillEnemies, out_events);

        for slot in PlayerSlot::ALL {
            let eligible = self.players[slot.index()]
                .as_ref()
                .and_then(Entity::player_state)
                .is_some_and(PlayerState::has_lives_left);
            if eligible {
                self.send_to_cage(slot, out_events);
            }
        }

        self.speed_level = 1.0;
        self.speed_timer = 0.0;
        self.pending = self.tuning.enemy_counts(self.stage);
        self.kill_count = 0;
        self.enemies_to_kill = self.pending.to_kill();
        self.level_starting = true;
        self.level_start_timer = LEVEL_START_DELAY;
        self.score_modifier = if self.apply_double_score { 2 } else { 1 };
        self.apply_double_score = false;

        log::info!(
            "stage {} on maze {} with {} enemies to kill",
            self.stage,
            self.level.layout().name(),
            self.enemies_to_kill
        );
        out_events.push(Event::LevelInitialized {
            stage: self.stage,
            level_name: self.level.layout().name().to_owned(),
            enemies_to_kill: self.enemies_to_kill,
            score_modifier: self.score_modifier,
        });
    }

    fn start_level(&mut self, out_events: &mut Vec<Event>) {
        self.level_starting = false;
        for _ in 0..self.pending.burwors {
            let _ = self.spawn_enemy(EnemyKind::Burwor, false, out_events);
        }
        out_events.push(Event::LevelStarted { stage: self.stage });
    }

    fn clear_level(&mut self) {
        self.level.reset(self.stage);
        self.enemies.clear();
        self.kill_all_bullets();
    }

    fn kill_all_bullets(&mut self) {
        for state in self.players.iter_mut().flatten().filter_map(Entity::player_state_mut) {
            state.bullet = None;
        }
        self.enemy_bullet.clear();
    }

    fn next_level(&mut self, out_events: &mut Vec<Event>) {
        if self.stage + 1 >= MAX_LEVELS {
            self.complete_game(out_events);
            return;
        }
        self.stage += 1;
        self.clear_level();
        self.init_level(out_events);
    }

    fn end_game(&mut self, out_events: &mut Vec<Event>) {
        self.clear_level();
        self.status = GameStatus::Over;
        self.stage = 0;
        self.score_modifier = 1;
        let scores = self.scores();
        log::info!("game over with scores {scores:?}");
        out_events.push(Event::GameOver { scores });
    }

    fn complete_game(&mut self, out_events: &mut Vec<Event>) {
        self.clear_level();
        self.status = GameStatus::Completed;
        let scores = self.scores();
        log::info!("all stages cleared with scores {scores:?}");
        out_events.push(Event::GameCompleted { scores });
    }

    fn abandon_game(&mut self) {
        self.clear_level();
        self.deaths.clear();
        self.players = [None, None];
        self.phase = LevelPhase::KillEnemies;
        self.level_starting = false;
        self.status = GameStatus::Idle;
        self.shake.stop();
    }

    fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        can_become_invisible: bool,
        out_events: &mut Vec<Event>,
    ) -> EntityId {
        let id = self.allocate_enemy_id();
        let mut state = EnemyState::new(id, kind, self.tuning.scores.for_kind(kind), Steering::free());
        state.can_become_invisible = can_become_invisible && self.stage != 2;
        state.can_fire = match self.stage {
            0 | 1 => false,
            2 => kind != EnemyKind::Burwor,
            _ => true,
        };

        let position = self.level.random_position(&mut self.rng, true);
        let start = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        let (direction, _) =
            self.level
                .pick_direction(position, start, &mut state.steering, &mut self.rng);
        let speed = self.tuning.threshold_speed(self.level.threshold()) * self.speed_level;
        let tint = match kind {
            EnemyKind::Burwor => BURWOR_TINT,
            EnemyKind::Garwor | EnemyKind::Worluk => GARWOR_TINT,
            EnemyKind::Thorwor => THORWOR_TINT,
            EnemyKind::Wizard => WIZARD_TINT,
        };

        self.enemies.push(Entity::with_behavior(
            Behavior::Enemy(state),
            position,
            direction,
            tint,
            speed,
        ));
        out_events.push(Event::EnemySpawned { enemy: id, kind });
        id
    }

    fn spawn_worluk(&mut self, out_events: &mut Vec<Event>) {
        let id = self.allocate_enemy_id();
        let position = self.level.random_position(&mut self.rng, true);
        let mut state = EnemyState::new(
            id,
            EnemyKind::Worluk,
            self.tuning.scores.worluk,
            Steering::drawn_towards(self.level.side_of(position)),
        );
        let start = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        let (direction, _) =
            self.level
                .pick_direction(position, start, &mut state.steering, &mut self.rng);

        self.enemies.push(Entity::with_behavior(
            Behavior::Worluk(state),
            position,
            direction,
            GARWOR_TINT,
            WORLUK_SPEED,
        ));
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind: EnemyKind::Worluk,
        });
    }

    fn spawn_wizard(&mut self, out_events: &mut Vec<Event>) {
        let id = self.allocate_enemy_id();
        let position = self.level.wizard_teleport_position(&mut self.rng);
        let direction = self
            .level
            .wizard_direction(position, Direction::East, &mut self.rng);
        let state = EnemyState::new(
            id,
            EnemyKind::Wizard,
            self.tuning.scores.wizard,
            Steering::free(),
        );
        let clock = TeleportClock {
            timer: 0.0,
            cooldown: self.tuning.wizard_teleport_cooldown,
        };

        self.enemies.push(Entity::with_behavior(
            Behavior::Wizard(state, clock),
            position,
            direction,
            WIZARD_TINT,
            self.tuning.wizard_speed,
        ));
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind: EnemyKind::Wizard,
        });
    }

    fn send_to_cage(&mut self, slot: PlayerSlot, out_events: &mut Vec<Event>) {
        let others_alive = self.any_player_alive();
        let Some(player) = self.players[slot.index()].as_mut() else {
            return;
        };
        let has_lives = player
            .player_state()
            .is_some_and(PlayerState::has_lives_left);

        if has_lives {
            player.enter_cage();
            out_events.push(Event::PlayerCaged { slot });
        } else if self.multiplayer && others_alive {
            player.disable();
            if let Some(state) = player.player_state_mut() {
                state.time_to_cage = 0.0;
            }
            log::info!("player {} is out of lives", slot.index() + 1);
            out_events.push(Event::PlayerEliminated { slot });
        } else {
            self.end_game(out_events);
        }
    }

    fn leave_cage(&mut self, slot: PlayerSlot, out_events: &mut Vec<Event>) {
        if let Some(player) = self.players[slot.index()].as_mut() {
            player.leave_cage();
            out_events.push(Event::PlayerLeftCage { slot });
        }
    }

    fn kill_player(&mut self, slot: PlayerSlot, out_events: &mut Vec<Event>) {
        let Some(player) = self.players[slot.index()].as_mut() else {
            return;
        };
        if !player.visible() || !player.enabled() {
            return;
        }
        let (position, tint) = (player.position(), player.tint());
        let Some(state) = player.player_state_mut() else {
            return;
        };
        state.bullet = None;
        state.lose_life();
        state.time_to_cage = CAGE_DELAY;
        let remaining_lives = state.lives();
        player.set_visible(false);

        self.deaths.push(DeathAnimation::new(position, tint));
        let _ = self.shake.shake(3.0, 50.0, 0.5);
        out_events.push(Event::PlayerKilled {
            slot,
            remaining_lives,
        });
    }

    fn award(&mut self, slot: PlayerSlot, points: u32, out_events: &mut Vec<Event>) {
        let crossed = self.players[slot.index()]
            .as_mut()
            .and_then(Entity::player_state_mut)
            .is_some_and(|state| state.increase_score(points));
        if crossed {
            out_events.push(Event::ExtraLifeAwarded { slot });
        }
    }

    fn destroy_enemy(
        &mut self,
        enemy: EntityId,
        killer: Option<PlayerSlot>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self
            .enemies
            .iter()
            .position(|entity| entity.enemy_id() == Some(enemy))
        else {
            return;
        };
        let removed = self.enemies.remove(index);
        if self.enemy_bullet.owner() == Some(enemy) {
            self.enemy_bullet.clear();
        }
        let Some((kind, score)) = removed
            .enemy_state()
            .map(|state| (state.kind(), state.score()))
        else {
            return;
        };

        let awarded = match killer {
            Some(slot) => {
                let points = score * self.score_modifier;
                self.award(slot, points, out_events);
                points
            }
            None => 0,
        };
        self.deaths
            .push(DeathAnimation::new(removed.position(), removed.tint()));
        out_events.push(Event::EnemyKilled {
            enemy,
            kind,
            killer,
            awarded,
        });

        if kind == EnemyKind::Wizard && self.phase == LevelPhase::Wizard {
            self.set_phase(LevelPhase::WizardDeath, out_events);
            let _ = self.shake.shake(4.0, 50.0, 2.0);
            self.kill_all_bullets();
        }
        self.kill_count += 1;
        self.update_enemies_spawn(out_events);
    }

    fn update_enemies_spawn(&mut self, out_events: &mut Vec<Event>) {
        if self.phase != LevelPhase::KillEnemies {
            self.apply_double_score = true;
            if self.phase == LevelPhase::Worluk {
                self.next_level_phase(out_events);
            }
            return;
        }

        if self.kill_count >= self.enemies_to_kill {
            if self.stage <= 1 {
                self.next_level(out_events);
            } else {
                self.next_level_phase(out_events);
            }
        } else if self.kill_count + self.stage >= 4 {
            let invisible = self.stage > 0;
            if self.pending.garwors >= self.pending.thorwors {
                if self.pending.garwors > 0 {
                    self.pending.garwors -= 1;
                    let _ = self.spawn_enemy(EnemyKind::Garwor, invisible, out_events);
                }
            } else {
                self.pending.thorwors -= 1;
                let _ = self.spawn_enemy(EnemyKind::Thorwor, invisible, out_events);
            }
        }
    }

    fn next_level_phase(&mut self, out_events: &mut Vec<Event>) {
        match self.phase {
            LevelPhase::KillEnemies => {
                if self.stage > 1 {
                    self.set_phase(LevelPhase::Worluk, out_events);
                    self.spawn_worluk(out_events);
                } else {
                    self.next_level(out_events);
                }
            }
            LevelPhase::Worluk => {
                if self.rng.gen_bool(0.5) {
                    self.set_phase(LevelPhase::Wizard, out_events);
                    self.spawn_wizard(out_events);
                } else {
                    self.set_phase(LevelPhase::WorlukDeath, out_events);
                    let _ = self.shake.shake(4.0, 50.0, 2.0);
                    self.kill_all_bullets();
                }
            }
            LevelPhase::WorlukDeath | LevelPhase::WizardDeath => self.next_level(out_events),
            LevelPhase::Wizard | LevelPhase::WorlukEscape => {}
        }
    }

    fn worluk_escape(&mut self, out_events: &mut Vec<Event>) {
        log::info!("the Worluk escaped on stage {}", self.stage);
        self.set_phase(LevelPhase::WorlukEscape, out_events);
        self.kill_all_bullets();
        out_events.push(Event::WorlukEscaped);
    }

    fn advance_level(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        if self.status != GameStatus::Running {
            return;
        }
        if self.phase.is_timed() {
            self.phase_timer += dt;
            let duration = match self.phase {
                LevelPhase::WorlukEscape => ESCAPE_PHASE_DURATION,
                _ => DEATH_PHASE_DURATION,
            };
            if self.phase_timer >= duration {
                match self.phase {
                    LevelPhase::WorlukEscape => self.next_level(out_events),
                    _ => self.next_level_phase(out_events),
                }
            }
            return;
        }
        if self.level_starting {
            self.level_start_timer -= dt;
            if self.level_start_timer <= 0.0 {
                self.start_level(out_events);
            }
            return;
        }

        self.speed_timer += dt;
        if self.speed_timer >= SPEED_INTERVAL {
            self.speed_timer = 0.0;
            if self.speed_level < MAX_SPEED_LEVEL {
                self.speed_level = (self.speed_level + SPEED_INCREMENT).min(MAX_SPEED_LEVEL);
                out_events.push(Event::SpeedIncreased {
                    level: self.speed_level,
                });
            }
        }
        self.level.update(dt);

        let cage_time = self.tuning.player_time_in_cage;
        for slot in PlayerSlot::ALL {
            if self.status != GameStatus::Running {
                break;
            }
            let Some(state) = self.players[slot.index()]
                .as_mut()
                .and_then(Entity::player_state_mut)
            else {
                continue;
            };
            let mut cage_due = false;
            if state.time_to_cage > 0.0 {
                state.time_to_cage -= dt;
                cage_due = state.time_to_cage <= 0.0;
            }
            let mut leave_due = false;
            if state.in_cage {
                state.time_in_cage += dt;
                leave_due = state.time_in_cage >= cage_time;
            }

            if cage_due {
                self.send_to_cage(slot, out_events);
            } else if leave_due {
                self.leave_cage(slot, out_events);
            }
        }
    }

    fn steer_player(&mut self, slot: PlayerSlot, intent: PlayerIntent, out_events: &mut Vec<Event>) {
        if !self.is_playing() {
            return;
        }
        let Some(player) = self.players[slot.index()].as_ref() else {
            return;
        };
        let Some(state) = player.player_state() else {
            return;
        };
        if !player.enabled() {
            return;
        }
        if state.in_cage() {
            if intent.any_move() {
                self.leave_cage(slot, out_events);
            }
            return;
        }
        if !player.visible() {
            return;
        }

        let bullet_id = BulletId::new(self.next_bullet);
        let speed = self.tuning.player_bullet_speed;
        let level = &self.level;
        let Some(player) = self.players[slot.index()].as_mut() else {
            return;
        };

        if intent.fire_pressed {
            let (origin, facing) = (player.position(), player.direction());
            let fired = player.player_state_mut().is_some_and(|state| {
                state.try_fire(|| {
                    Bullet::fire(bullet_id, Shooter::Player(slot), origin, facing, speed, TargetType::Any)
                })
            });
            if fired {
                self.next_bullet = self.next_bullet.wrapping_add(1);
                let _ = self.shake.shake(2.0, 50.0, 0.1);
                out_events.push(Event::PlayerFired { slot });
            }
        }

        if !level.is_on_grid_cell(player.position()) {
            return;
        }
        let options = level.can_move(player.position());
        let wanted = [
            (intent.left, Direction::West),
            (intent.right, Direction::East),
            (intent.down, Direction::South),
            (intent.up, Direction::North),
        ]
        .into_iter()
        .find(|(held, direction)| *held && options.allows(*direction))
        .map(|(_, direction)| direction);

        if let Some(direction) = wanted {
            if player.direction() == direction {
                player.advance();
            } else {
                player.look(direction);
            }
        }
    }

    fn update_enemies(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        if !self.is_playing() {
            return;
        }
        let base_speed = self.tuning.threshold_speed(self.level.threshold()) * self.speed_level;
        let mut index = 0;

        while index < self.enemies.len() {
            let enemy = &mut self.enemies[index];
            let Some(enemy_id) = enemy.enemy_id() else {
                index += 1;
                continue;
            };
            enemy.tick_visibility(dt);

            if enemy.is_wizard() {
                let mut teleport = false;
                if let Some(clock) = enemy.teleport_clock_mut() {
                    clock.timer += dt;
                    if clock.timer > clock.cooldown {
                        clock.timer -= clock.cooldown;
                        teleport = true;
                    }
                }
                if teleport {
                    let position = self.level.wizard_teleport_position(&mut self.rng);
                    enemy.move_to(position);
                    let direction =
                        self.level
                            .wizard_direction(position, enemy.direction(), &mut self.rng);
                    enemy.look(direction);

                    let bullet_id = BulletId::new(self.next_bullet);
                    let speed = self.tuning.enemy_bullet_speed;
                    if self.enemy_bullet.try_fire(|| {
                        Bullet::fire(bullet_id, Shooter::Enemy(enemy_id), position, direction, speed, TargetType::Player)
                    }) {
                        self.next_bullet = self.next_bullet.wrapping_add(1);
                        out_events.push(Event::EnemyFired { enemy: enemy_id });
                    }
                    let _ = self.shake.shake(1.0, 100.0, 0.2);
                    out_events.push(Event::WizardTeleported { enemy: enemy_id });
                }

                if !self.level.is_wizard_position(enemy.position()) {
                    let position = self.level.wizard_teleport_position(&mut self.rng);
                    enemy.move_to(position);
                }
                let ahead = enemy.position().offset(
                    enemy.direction().dx() as f32 * WIZARD_STEP,
                    enemy.direction().dy() as f32 * WIZARD_STEP,
                );
                if self.level.is_wizard_position(ahead) {
                    enemy.advance();
                } else {
                    let direction =
                        self.level
                            .wizard_direction(enemy.position(), enemy.direction(), &mut self.rng);
                    enemy.look(direction);
                }
            } else {
                if !enemy.is_worluk() {
                    enemy.set_speed(base_speed);
                }
                let (position, current) = (enemy.position(), enemy.direction());
                let Some(state) = enemy.enemy_state_mut() else {
                    index += 1;
                    continue;
                };
                let (direction, tunnel) =
                    self.level
                        .pick_direction(position, current, &mut state.steering, &mut self.rng);
                enemy.look(direction);

                match tunnel.filter(|side| side.exit_direction() == direction) {
                    Some(_) if enemy.is_worluk() => {
                        let _ = self.enemies.remove(index);
                        self.worluk_escape(out_events);
                        continue;
                    }
                    Some(side) => {
                        let exit = side.mirror();
                        enemy.move_to(self.level.tunnel_position(exit));
                        out_events.push(Event::EnemyTunnelled {
                            enemy: enemy_id,
                            exit,
                        });
                    }
                    None => enemy.advance(),
                }
            }
            enemy.animate(dt);

            let bullet_live = self.enemy_bullet.is_live();
            let aimed = self
                .players
                .iter()
                .flatten()
                .any(|player| enemy.can_fire_at(player, bullet_live));
            if aimed {
                let bullet_id = BulletId::new(self.next_bullet);
                let (origin, facing) = (enemy.position(), enemy.direction());
                let speed = self.tuning.enemy_bullet_speed;
                if self.enemy_bullet.try_fire(|| {
                    Bullet::fire(bullet_id, Shooter::Enemy(enemy_id), origin, facing, speed, TargetType::Player)
                }) {
                    self.next_bullet = self.next_bullet.wrapping_add(1);
                    out_events.push(Event::EnemyFired { enemy: enemy_id });
                }
            }

            for player in self.players.iter().flatten().filter(|player| player.enabled()) {
                enemy.reveal_if_aligned(player);
            }
            index += 1;
        }
    }

    fn check_player_contacts(&mut self, out_events: &mut Vec<Event>) {
        if !self.is_playing() {
            return;
        }
        for slot in PlayerSlot::ALL {
            let touching = self.players[slot.index()]
                .as_ref()
                .filter(|player| player.visible() && player.enabled())
                .is_some_and(|player| {
                    let (x, y) = (player.position().pixel_x(), player.position().pixel_y());
                    self.enemies.iter().any(|enemy| {
                        (enemy.position().pixel_x() - x).abs() <= CONTACT_DISTANCE
                            && (enemy.position().pixel_y() - y).abs() <= CONTACT_DISTANCE
                    })
                });
            if touching {
                self.kill_player(slot, out_events);
            }
        }
    }

    fn advance_bullets(&mut self, dt: f32) {
        if !self.is_playing() {
            return;
        }
        let layout = self.level.layout();
        for state in self
            .players
            .iter_mut()
            .flatten()
            .filter_map(Entity::player_state_mut)
        {
            let escaped = state.bullet.as_mut().is_some_and(|bullet| {
                bullet.advance(dt);
                !layout.is_inside_walls(bullet.position())
            });
            if escaped {
                state.bullet = None;
            }
        }

        let escaped = self.enemy_bullet.bullet_mut().is_some_and(|bullet| {
            bullet.advance(dt);
            !layout.is_inside_walls(bullet.position())
        });
        if escaped {
            self.enemy_bullet.clear();
        }
    }

    fn live_shooter(&self, bullet: BulletId) -> Option<Shooter> {
        self.players
            .iter()
            .flatten()
            .filter_map(Entity::player_state)
            .filter_map(PlayerState::bullet)
            .chain(self.enemy_bullet.bullet())
            .find(|live| live.id() == bullet)
            .map(Bullet::shooter)
    }

    fn remove_bullet(&mut self, bullet: BulletId) {
        for state in self
            .players
            .iter_mut()
            .flatten()
            .filter_map(Entity::player_state_mut)
        {
            if state.bullet.as_ref().is_some_and(|live| live.id() == bullet) {
                state.bullet = None;
            }
        }
        if self
            .enemy_bullet
            .bullet()
            .is_some_and(|live| live.id() == bullet)
        {
            self.enemy_bullet.clear();
        }
    }

    fn apply_collisions(&mut self, result: PhysicsResult, out_events: &mut Vec<Event>) {
        if self.status != GameStatus::Running {
            return;
        }
        for collision in result.collisions {
            let bullet = collision.bullet();
            let Some(shooter) = self.live_shooter(bullet) else {
                log::trace!(
                    "ignoring collision for retired bullet {} from frame {}",
                    bullet.get(),
                    result.frame
                );
                continue;
            };

            match collision {
                Collision::BulletWall { .. } => self.remove_bullet(bullet),
                Collision::BulletPlayer { slot, .. } => {
                    if shooter == Shooter::Player(slot) {
                        continue;
                    }
                    let exposed = self.players[slot.index()]
                        .as_ref()
                        .is_some_and(|player| player.visible() && player.enabled());
                    if !exposed {
                        continue;
                    }
                    self.remove_bullet(bullet);
                    if let Shooter::Player(killer) = shooter {
                        self.award(killer, self.tuning.scores.other_player, out_events);
                    }
                    self.kill_player(slot, out_events);
                }
                Collision::BulletEnemy { enemy, .. } => {
                    let present = self
                        .enemies
                        .iter()
                        .any(|entity| entity.enemy_id() == Some(enemy));
                    if !present {
                        continue;
                    }
                    self.remove_bullet(bullet);
                    let killer = match shooter {
                        Shooter::Player(slot) => Some(slot),
                        Shooter::Enemy(_) => None,
                    };
                    self.destroy_enemy(enemy, killer, out_events);
                }
            }
        }
    }

    fn age_death_animations(&mut self, dt: f32) {
        for death in &mut self.deaths {
            death.update(dt);
        }
        self.deaths.retain(|death| !death.is_finished());
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartGame { multiplayer } => world.start_game(multiplayer, out_events),
        Command::AbandonGame => world.abandon_game(),
        Command::DecayCameraShake { dt } => world.shake.update(dt.as_secs_f32()),
        Command::AdvanceLevel { dt } => world.advance_level(dt.as_secs_f32(), out_events),
        Command::SteerPlayer { slot, intent } => world.steer_player(slot, intent, out_events),
        Command::UpdateEnemies { dt } => world.update_enemies(dt.as_secs_f32(), out_events),
        Command::CheckPlayerContacts => world.check_player_contacts(out_events),
        Command::AdvanceBullets { dt } => world.advance_bullets(dt.as_secs_f32()),
        Command::ApplyCollisions { result } => world.apply_collisions(result, out_events),
        Command::KillEnemy { enemy, killer } => {
            if world.status == GameStatus::Running {
                world.destroy_enemy(enemy, killer, out_events);
            }
        }
        Command::AgeDeathAnimations { dt } => world.age_death_animations(dt.as_secs_f32()),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{sync::Arc, time::Duration};

    use super::{
        Bullet, DeathAnimation, EnemyBulletSlot, Entity, GameStatus, GridLevel, PlayerState, World,
    };
    use wizard_maze_core::{
        BulletBody, BulletSnapshot, EnemyBody, EnemySnapshot, GameStateSnapshot, LevelPhase,
        PhysicsSnapshot, PixelPoint, PlayerBody, PlayerSlot, TeammateSnapshot,
    };

    /// Lifecycle state of the session.
    #[must_use]
    pub fn status(world: &World) -> GameStatus {
        world.status
    }

    /// Whether the running game has two players.
    #[must_use]
    pub fn is_multiplayer(world: &World) -> bool {
        world.multiplayer
    }

    /// Zero-based stage index.
    #[must_use]
    pub fn stage(world: &World) -> u32 {
        world.stage
    }

    /// Active level phase.
    #[must_use]
    pub fn phase(world: &World) -> LevelPhase {
        world.phase
    }

    /// Whether the stage still waits for its start delay.
    #[must_use]
    pub fn is_level_starting(world: &World) -> bool {
        world.level_starting
    }

    /// Whether gameplay updates currently run.
    #[must_use]
    pub fn is_playing(world: &World) -> bool {
        world.is_playing()
    }

    /// Active maze and its clocks.
    #[must_use]
    pub fn level(world: &World) -> &GridLevel {
        &world.level
    }

    /// Player occupying the slot, if any.
    #[must_use]
    pub fn player(world: &World, slot: PlayerSlot) -> Option<&Entity> {
        world.players[slot.index()].as_ref()
    }

    /// Whether the player in the slot waits in its cage.
    #[must_use]
    pub fn is_caged(world: &World, slot: PlayerSlot) -> bool {
        player(world, slot)
            .and_then(Entity::player_state)
            .is_some_and(PlayerState::in_cage)
    }

    /// Enemies present in the maze.
    #[must_use]
    pub fn enemies(world: &World) -> &[Entity] {
        &world.enemies
    }

    /// The shared enemy bullet slot.
    #[must_use]
    pub fn enemy_bullet(world: &World) -> &EnemyBulletSlot {
        &world.enemy_bullet
    }

    /// Iterates every live bullet, players first.
    pub fn bullets(world: &World) -> impl Iterator<Item = &Bullet> {
        world
            .players
            .iter()
            .flatten()
            .filter_map(Entity::player_state)
            .filter_map(PlayerState::bullet)
            .chain(world.enemy_bullet.bullet())
    }

    /// Progress towards clearing the regular enemies of the stage.
    #[must_use]
    pub fn kill_progress(world: &World) -> KillProgress {
        KillProgress {
            killed: world.kill_count,
            required: world.enemies_to_kill,
        }
    }

    /// Multiplier applied to kill scores during the stage.
    #[must_use]
    pub fn score_modifier(world: &World) -> u32 {
        world.score_modifier
    }

    /// Global enemy speed multiplier.
    #[must_use]
    pub fn speed_level(world: &World) -> f32 {
        world.speed_level
    }

    /// Display offset produced by the camera shake.
    #[must_use]
    pub fn camera_offset(world: &World) -> PixelPoint {
        world.shake.offset()
    }

    /// Death animations still playing.
    #[must_use]
    pub fn death_animations(world: &World) -> &[DeathAnimation] {
        &world.deaths
    }

    /// Scores per slot.
    #[must_use]
    pub fn scores(world: &World) -> [Option<u32>; 2] {
        world.scores()
    }

    /// Copies what the collision resolver needs into an owned snapshot.
    #[must_use]
    pub fn physics_snapshot(world: &World, timestamp: Duration, frame: u64) -> PhysicsSnapshot {
        PhysicsSnapshot {
            bullets: bullets(world)
                .map(|bullet| BulletBody {
                    bullet: bullet.id(),
                    shooter: bullet.shooter(),
                    position: bullet.position(),
                    target: bullet.target(),
                })
                .collect(),
            players: world
                .players
                .iter()
                .flatten()
                .filter_map(|player| {
                    let state = player.player_state()?;
                    Some(PlayerBody {
                        slot: state.slot(),
                        position: player.position(),
                        visible: player.visible() && player.enabled(),
                    })
                })
                .collect(),
            enemies: world
                .enemies
                .iter()
                .filter_map(|enemy| {
                    Some(EnemyBody {
                        enemy: enemy.enemy_id()?,
                        position: enemy.position(),
                        visible: enemy.visible(),
                    })
                })
                .collect(),
            layout: Arc::clone(world.level.layout()),
            timestamp,
            frame,
        }
    }

    /// Copies the state one AI controller reasons about.
    ///
    /// Returns `None` when the slot is empty or its player was eliminated.
    #[must_use]
    pub fn ai_snapshot(
        world: &World,
        slot: PlayerSlot,
        cooperative: bool,
        elapsed: Duration,
    ) -> Option<GameStateSnapshot> {
        let player = player(world, slot).filter(|player| player.enabled())?;
        let state = player.player_state()?;
        let teammate = self::player(world, slot.other())
            .filter(|teammate| teammate.enabled())
            .and_then(|teammate| {
                Some(TeammateSnapshot {
                    position: teammate.position(),
                    direction: teammate.direction(),
                    in_cage: teammate.player_state()?.in_cage(),
                })
            });

        Some(GameStateSnapshot {
            slot,
            elapsed,
            position: player.position(),
            direction: player.direction(),
            in_cage: state.in_cage(),
            has_bullet: state.bullet().is_some(),
            cooperative,
            enemies: world
                .enemies
                .iter()
                .filter_map(|enemy| {
                    let enemy_state = enemy.enemy_state()?;
                    Some(EnemySnapshot {
                        id: enemy_state.id(),
                        kind: enemy_state.kind(),
                        position: enemy.position(),
                        direction: enemy.direction(),
                        visible: enemy.visible(),
                    })
                })
                .collect(),
            bullets: bullets(world)
                .map(|bullet| BulletSnapshot {
                    position: bullet.position(),
                    velocity: bullet.velocity(),
                    target: bullet.target(),
                    shooter: bullet.shooter(),
                })
                .collect(),
            teammate,
            layout: Arc::clone(world.level.layout()),
        })
    }

    /// Regular enemies killed against the number required to clear the stage.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct KillProgress {
        /// Enemies killed so far.
        pub killed: u32,
        /// Enemies to kill before the boss phases.
        pub required: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, query, Entity, GameStatus, World, INVISIBILITY_DELAY};
    use std::time::Duration;
    use wizard_maze_core::{
        Collision, Command, Direction, EnemyKind, EntityId, Event, GameConfig, LevelPhase,
        MazeLayout, PhysicsResult, PixelPoint, PlayerIntent, PlayerSlot, TunnelSide, Tuning,
    };

    fn sample_layout() -> MazeLayout {
        crate::parse_level(
            "Level1",
            "3222222222222\n1002000002010\n1020100010210\n1000020200010\n\
             1021000012010\n1000002000010\n1222222222230\n0000000000000\n",
        )
        .expect("sample level parses")
    }

    fn tuning(pairs: &[(&str, &str)]) -> Tuning {
        let mut config = GameConfig::default();
        config.set("CAMERA_SHAKE", "false");
        for (key, value) in pairs {
            config.set(key, value);
        }
        Tuning::from_config(&config)
    }

    fn started_world(tuning: Tuning, stage: u32) -> (World, Vec<Event>) {
        let mut world = World::new(vec![sample_layout()], tuning, 7);
        let mut events = Vec::new();
        apply(&mut world, Command::StartGame { multiplayer: false }, &mut events);
        if stage > 0 {
            world.stage = stage;
            world.init_level(&mut events);
        }
        apply(
            &mut world,
            Command::AdvanceLevel {
                dt: Duration::from_secs_f32(1.5),
            },
            &mut events,
        );
        (world, events)
    }

    fn enemy_ids(world: &World) -> Vec<EntityId> {
        query::enemies(world)
            .iter()
            .filter_map(Entity::enemy_id)
            .collect()
    }

    fn release_player(world: &mut World, position: PixelPoint) {
        let player = world.players[0].as_mut().expect("player one exists");
        player.leave_cage();
        player.move_to(position);
    }

    fn kill_all(world: &mut World, events: &mut Vec<Event>) {
        for enemy in enemy_ids(world) {
            apply(
                world,
                Command::KillEnemy {
                    enemy,
                    killer: Some(PlayerSlot::One),
                },
                events,
            );
        }
    }

    #[test]
    fn level_start_delay_releases_the_burwors() {
        let (world, events) = started_world(tuning(&[("BURWORS", "3")]), 0);
        assert!(events.contains(&Event::GameStarted { multiplayer: false }));
        assert!(events.contains(&Event::LevelStarted { stage: 0 }));
        assert!(!query::is_level_starting(&world));
        assert_eq!(query::enemies(&world).len(), 3);
        assert!(query::is_caged(&world, PlayerSlot::One));
        assert_eq!(query::kill_progress(&world).required, 3);
    }

    #[test]
    fn reinforcements_enter_visible_and_only_they_fade() {
        let (mut world, mut events) =
            started_world(tuning(&[("BURWORS", "4"), ("GARWORS_LEVEL_4", "2")]), 3);
        assert!(query::enemies(&world).iter().all(Entity::visible));

        let first = enemy_ids(&world)[0];
        apply(
            &mut world,
            Command::KillEnemy {
                enemy: first,
                killer: Some(PlayerSlot::One),
            },
            &mut events,
        );
        let garwor = world
            .enemies
            .iter()
            .position(|enemy| enemy.enemy_kind() == Some(EnemyKind::Garwor))
            .expect("the first kill on stage four calls in a garwor");
        assert!(world.enemies[garwor].visible(), "new enemies start visible");

        for enemy in &mut world.enemies {
            enemy.tick_visibility(INVISIBILITY_DELAY);
        }
        for enemy in query::enemies(&world) {
            let fades = enemy.enemy_kind() == Some(EnemyKind::Garwor);
            assert_eq!(enemy.visible(), !fades, "{:?}", enemy.enemy_kind());
        }
    }

    #[test]
    fn early_stages_advance_straight_to_the_next_level() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "3")]), 0);
        kill_all(&mut world, &mut events);

        assert_eq!(query::stage(&world), 1);
        assert_eq!(query::phase(&world), LevelPhase::KillEnemies);
        assert_eq!(query::scores(&world)[0], Some(300));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::LevelInitialized { stage: 1, .. }
        )));
    }

    #[test]
    fn clearing_later_stages_summons_exactly_one_worluk() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "3")]), 2);
        assert_eq!(query::enemies(&world).len(), 3);
        kill_all(&mut world, &mut events);

        assert_eq!(query::phase(&world), LevelPhase::Worluk);
        assert_eq!(query::enemies(&world).len(), 1);
        assert!(query::enemies(&world)[0].is_worluk());
    }

    #[test]
    fn boss_kill_doubles_the_next_stage_score() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "3")]), 2);
        kill_all(&mut world, &mut events);
        kill_all(&mut world, &mut events);

        match query::phase(&world) {
            LevelPhase::Wizard => {
                assert!(query::enemies(&world)[0].is_wizard());
                kill_all(&mut world, &mut events);
                assert_eq!(query::phase(&world), LevelPhase::WizardDeath);
            }
            LevelPhase::WorlukDeath => assert!(query::enemies(&world).is_empty()),
            other => panic!("unexpected phase after the Worluk died: {other:?}"),
        }

        apply(
            &mut world,
            Command::AdvanceLevel {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        assert_eq!(query::stage(&world), 3);
        assert_eq!(query::score_modifier(&world), 2);
    }

    #[test]
    fn worluk_escapes_through_an_open_tunnel() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "3")]), 2);
        kill_all(&mut world, &mut events);
        world.level.reset(2);
        let tunnel = world.level.tunnel_position(TunnelSide::Left);
        let worluk = &mut world.enemies[0];
        worluk.move_to(tunnel);
        worluk
            .enemy_state_mut()
            .expect("worluk is an enemy")
            .steering
            .can_change_direction = true;

        apply(
            &mut world,
            Command::UpdateEnemies {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        assert_eq!(query::phase(&world), LevelPhase::WorlukEscape);
        assert!(query::enemies(&world).is_empty());
        assert!(events.contains(&Event::WorlukEscaped));

        apply(
            &mut world,
            Command::AdvanceLevel {
                dt: Duration::from_millis(800),
            },
            &mut events,
        );
        assert_eq!(query::stage(&world), 3);
        assert_eq!(query::score_modifier(&world), 1);
    }

    #[test]
    fn only_one_enemy_bullet_flies_at_a_time() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "2")]), 3);
        release_player(&mut world, PixelPoint::new(72.0, 50.0));
        let placements = [
            (PixelPoint::new(24.0, 50.0), Direction::East),
            (PixelPoint::new(120.0, 50.0), Direction::West),
        ];
        for (enemy, (position, direction)) in world.enemies.iter_mut().zip(placements) {
            enemy.move_to(position);
            enemy.look(direction);
            enemy.set_visible(true);
            enemy
                .enemy_state_mut()
                .expect("regular enemy")
                .steering
                .can_change_direction = false;
        }
        let first = world.enemies[0].enemy_id();
        events.clear();

        apply(
            &mut world,
            Command::UpdateEnemies {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        let fired = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyFired { .. }))
            .count();
        assert_eq!(fired, 1);
        assert_eq!(query::enemy_bullet(&world).owner(), first);
    }

    #[test]
    fn stale_collisions_are_ignored() {
        let (mut world, mut events) = started_world(tuning(&[("BURWORS", "2")]), 0);
        release_player(&mut world, PixelPoint::new(72.0, 50.0));
        apply(
            &mut world,
            Command::SteerPlayer {
                slot: PlayerSlot::One,
                intent: PlayerIntent {
                    fire_pressed: true,
                    ..PlayerIntent::default()
                },
            },
            &mut events,
        );
        let bullet = query::bullets(&world)
            .next()
            .map(|bullet| bullet.id())
            .expect("player fired");
        let enemy = enemy_ids(&world)[0];
        let result = PhysicsResult {
            collisions: vec![Collision::BulletEnemy { bullet, enemy }],
            ..PhysicsResult::default()
        };

        apply(
            &mut world,
            Command::ApplyCollisions {
                result: result.clone(),
            },
            &mut events,
        );
        assert!(events.contains(&Event::EnemyKilled {
            enemy,
            kind: EnemyKind::Burwor,
            killer: Some(PlayerSlot::One),
            awarded: 100,
        }));
        assert_eq!(query::enemies(&world).len(), 1);
        assert_eq!(query::bullets(&world).count(), 0);

        apply(&mut world, Command::ApplyCollisions { result }, &mut events);
        assert_eq!(query::enemies(&world).len(), 1);
        assert_eq!(query::scores(&world)[0], Some(100));
    }

    #[test]
    fn last_life_lost_ends_the_game() {
        let (mut world, mut events) =
            started_world(tuning(&[("BURWORS", "1"), ("PLAYER_MAX_LIVES", "0")]), 0);
        let position = PixelPoint::new(72.0, 50.0);
        release_player(&mut world, position);
        world.enemies[0].move_to(position.offset(1.0, 0.0));

        apply(&mut world, Command::CheckPlayerContacts, &mut events);
        assert!(events.contains(&Event::PlayerKilled {
            slot: PlayerSlot::One,
            remaining_lives: -1,
        }));

        apply(
            &mut world,
            Command::AdvanceLevel {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        assert_eq!(query::status(&world), GameStatus::Over);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::GameOver { .. })));
    }

    #[test]
    fn crossing_the_extra_life_score_grants_a_life() {
        let (mut world, mut events) =
            started_world(tuning(&[("BURWORS", "3"), ("EXTRA_LIFE_SCORE", "150")]), 0);
        let ids = enemy_ids(&world);
        for enemy in ids.into_iter().take(2) {
            apply(
                &mut world,
                Command::KillEnemy {
                    enemy,
                    killer: Some(PlayerSlot::One),
                },
                &mut events,
            );
        }
        let lives = query::player(&world, PlayerSlot::One)
            .and_then(Entity::player_state)
            .map(|state| state.lives());
        assert_eq!(lives, Some(4));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::ExtraLifeAwarded { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn snapshots_share_the_layout_and_list_live_entities() {
        let (world, _) = started_world(tuning(&[("BURWORS", "2")]), 0);
        let physics = query::physics_snapshot(&world, Duration::from_secs(2), 42);
        assert_eq!(physics.enemies.len(), 2);
        assert_eq!(physics.players.len(), 1);
        assert_eq!(physics.frame, 42);

        let snapshot = query::ai_snapshot(&world, PlayerSlot::One, false, Duration::ZERO)
            .expect("player one is present");
        assert!(snapshot.in_cage);
        assert!(snapshot.teammate.is_none());
        assert!(std::sync::Arc::ptr_eq(&snapshot.layout, &physics.layout));
        assert!(query::ai_snapshot(&world, PlayerSlot::Two, false, Duration::ZERO).is_none());
    }
}
