#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame driver of a Wizard Maze session.
//!
//! The [`SimulationLoop`] owns the world and the background workers. Each
//! call to [`SimulationLoop::step`] samples the players' buttons, runs the
//! active screen and, during play, issues the world commands of one frame in
//! a fixed order while exchanging snapshots with the physics and AI workers.
//! The events of the frame are turned into audio commands and returned to the
//! caller.

pub mod cues;
mod session;

use std::time::Duration;

use wizard_maze_core::{AudioCommand, Buttons, Command, Event, PlayerIntent, PlayerSlot, VolumeChannel};
use wizard_maze_system_ai::AiVariant;
use wizard_maze_system_orchestrator::{
    BackendFactory, ShutdownReport, ThreadOrchestrator, ThreadStatus, SHUTDOWN_TIMEOUT,
};
use wizard_maze_system_physics::{resolve_collisions, PhysicsWorker};
use wizard_maze_world::{apply, query, GameStatus, World};

use session::MoveGate;
pub use session::{GameMode, PlayerType, Session, MOVE_COOLDOWN};

/// Time the game-over screen stays up.
pub const GAME_OVER_DURATION: Duration = Duration::from_secs(5);

/// Time the victory screen stays up.
pub const VICTORY_DURATION: Duration = Duration::from_secs(10);

const VOLUME_STEP: f32 = 0.1;
const MUSIC_FADE: Duration = Duration::from_millis(500);

/// Screen the loop is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Waiting for a game to be started.
    Menu,
    /// A game is running.
    Playing,
    /// Every player ran out of lives.
    GameOver {
        /// Time left before the menu returns.
        remaining: Duration,
    },
    /// The last stage was cleared.
    Victory {
        /// Time left before the menu returns.
        remaining: Duration,
    },
}

impl Screen {
    /// Runs one frame of a transient screen.
    ///
    /// Result screens count down and give way to the menu when their time is
    /// up or any key is pressed. Other screens are unaffected.
    #[must_use]
    pub fn advance(self, dt: Duration, any_key: bool) -> Self {
        let (remaining, rebuild): (Duration, fn(Duration) -> Screen) = match self {
            Screen::GameOver { remaining } => (remaining, |remaining| Screen::GameOver { remaining }),
            Screen::Victory { remaining } => (remaining, |remaining| Screen::Victory { remaining }),
            Screen::Menu | Screen::Playing => return self,
        };
        let remaining = remaining.saturating_sub(dt);
        if any_key || remaining.is_zero() {
            Screen::Menu
        } else {
            rebuild(remaining)
        }
    }
}

/// Non-movement keys handled during play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hotkey {
    /// Raises the master volume one step.
    VolumeUp,
    /// Lowers the master volume one step.
    VolumeDown,
    /// Stops the music, or restarts the main theme.
    ToggleMusic,
    /// Swaps a slot between human and AI control.
    TogglePilot(PlayerSlot),
    /// Switches AI teamwork on or off.
    ToggleCooperative,
    /// Abandons the game and returns to the menu.
    Abandon,
}

/// Everything the input device reported for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Held buttons of each human player.
    pub buttons: [Buttons; 2],
    /// Hotkeys pressed this frame.
    pub hotkeys: Vec<Hotkey>,
}

impl FrameInput {
    /// Whether anything at all was pressed.
    #[must_use]
    pub fn any_key(&self) -> bool {
        !self.hotkeys.is_empty() || self.buttons.iter().any(Buttons::any)
    }
}

/// Counters describing how the loop has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames stepped.
    pub frames: u64,
    /// Snapshots handed to the physics worker.
    pub threaded_batches: u64,
    /// Snapshots resolved on the simulation thread.
    pub inline_batches: u64,
    /// Worker results applied to the world.
    pub applied_results: u64,
}

/// Owns the world and the workers and advances them frame by frame.
#[derive(Debug)]
pub struct SimulationLoop {
    world: World,
    orchestrator: ThreadOrchestrator,
    session: Session,
    screen: Screen,
    previous: [Buttons; 2],
    gate: MoveGate,
    clock: Duration,
    master_volume: f32,
    music_on: bool,
    events: Vec<Event>,
    cues: Vec<AudioCommand>,
    stats: LoopStats,
}

impl SimulationLoop {
    /// Starts the workers and shows the menu.
    #[must_use]
    pub fn new(world: World, backend_factory: BackendFactory, seed: u64) -> Self {
        let mut orchestrator = ThreadOrchestrator::new(backend_factory, seed);
        orchestrator.start();
        Self {
            world,
            orchestrator,
            session: Session::default(),
            screen: Screen::Menu,
            previous: [Buttons::default(); 2],
            gate: MoveGate::default(),
            clock: Duration::ZERO,
            master_volume: 1.0,
            music_on: true,
            events: Vec::new(),
            cues: Vec::new(),
            stats: LoopStats::default(),
        }
    }

    /// Starts a game with the given line-up, replacing any running game.
    pub fn start_game(&mut self, session: Session) -> &[Event] {
        self.events.clear();
        self.orchestrator.ai().stop_all(SHUTDOWN_TIMEOUT);
        self.session = session;
        self.previous = [Buttons::default(); 2];
        self.gate.reset();
        self.execute(Command::StartGame {
            multiplayer: self.session.multiplayer,
        });
        for slot in PlayerSlot::ALL {
            if let PlayerType::Ai(variant) = self.session.player(slot) {
                if self.session.is_playing(slot) {
                    self.start_pilot(slot, variant);
                }
            }
        }
        self.screen = Screen::Playing;
        self.emit_audio();
        &self.events
    }

    /// Advances the session by one frame and returns the frame's events.
    pub fn step(&mut self, dt: Duration, input: &FrameInput) -> &[Event] {
        self.events.clear();
        self.stats.frames += 1;
        let _ = self.orchestrator.health_check();

        let intents = self.sample_buttons(input);
        if self.screen != Screen::Playing {
            self.screen = self.screen.advance(dt, input.any_key());
            return &self.events;
        }

        self.clock += dt;
        for hotkey in &input.hotkeys {
            self.handle_hotkey(*hotkey);
        }
        if self.screen != Screen::Playing {
            self.emit_audio();
            return &self.events;
        }

        self.execute(Command::DecayCameraShake { dt });
        self.execute(Command::AdvanceLevel { dt });
        if query::is_playing(&self.world) {
            for slot in PlayerSlot::ALL {
                self.steer(slot, intents[slot.index()]);
            }
            self.execute(Command::UpdateEnemies { dt });
            self.execute(Command::CheckPlayerContacts);
            self.execute(Command::AdvanceBullets { dt });
            self.exchange_physics();
            self.push_ai_state();
            self.execute(Command::AgeDeathAnimations { dt });
        }

        self.emit_audio();
        self.follow_status();
        &self.events
    }

    /// The world being simulated.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Active screen.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Line-up of the current or last game.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Simulated time spent playing.
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// Counters of the loop so far.
    #[must_use]
    pub const fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Current master volume.
    #[must_use]
    pub const fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Liveness of every worker.
    #[must_use]
    pub fn thread_status(&self) -> ThreadStatus {
        self.orchestrator.thread_status()
    }

    /// Drops the snapshots waiting for the physics worker.
    pub fn clear_physics_queue(&self) -> usize {
        self.orchestrator.clear_physics_queue()
    }

    /// Stops every worker within the shutdown timeout.
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.orchestrator.shutdown(SHUTDOWN_TIMEOUT)
    }

    fn execute(&mut self, command: Command) {
        apply(&mut self.world, command, &mut self.events);
    }

    fn sample_buttons(&mut self, input: &FrameInput) -> [PlayerIntent; 2] {
        PlayerSlot::ALL.map(|slot| {
            let current = match self.session.player(slot) {
                PlayerType::Human => input.buttons[slot.index()],
                PlayerType::Ai(_) => self.orchestrator.ai().buttons(slot),
            };
            let previous = std::mem::replace(&mut self.previous[slot.index()], current);
            PlayerIntent::from_samples(previous, current)
        })
    }

    fn steer(&mut self, slot: PlayerSlot, intent: PlayerIntent) {
        if !self.session.is_playing(slot) || intent.is_idle() {
            return;
        }
        let mut intent = intent;
        if intent.any_move() {
            let caged = query::is_caged(&self.world, slot);
            if !self
                .gate
                .admit(slot, self.clock, self.session.move_cooldown, caged)
            {
                intent = PlayerIntent {
                    fire_pressed: intent.fire_pressed,
                    ..PlayerIntent::default()
                };
            }
        }
        if !intent.is_idle() {
            self.execute(Command::SteerPlayer { slot, intent });
        }
    }

    fn exchange_physics(&mut self) {
        if let Some(result) = self
            .orchestrator
            .physics()
            .and_then(PhysicsWorker::take_result)
        {
            self.stats.applied_results += 1;
            apply(
                &mut self.world,
                Command::ApplyCollisions { result },
                &mut self.events,
            );
        }
        if query::bullets(&self.world).next().is_none() {
            return;
        }

        let snapshot = query::physics_snapshot(&self.world, self.clock, self.stats.frames);
        let inline = self
            .orchestrator
            .physics()
            .map_or(true, |worker| worker.submit(&snapshot).needs_inline());
        if inline {
            self.stats.inline_batches += 1;
            let result = resolve_collisions(&snapshot);
            self.execute(Command::ApplyCollisions { result });
        } else {
            self.stats.threaded_batches += 1;
        }
    }

    fn push_ai_state(&mut self) {
        for slot in PlayerSlot::ALL {
            if !self.session.player(slot).is_ai() || !self.session.is_playing(slot) {
                continue;
            }
            let snapshot =
                query::ai_snapshot(&self.world, slot, self.session.cooperative, self.clock);
            if let Some(snapshot) = snapshot {
                self.orchestrator.ai().push(snapshot);
            }
        }
    }

    fn start_pilot(&mut self, slot: PlayerSlot, variant: AiVariant) {
        if self.orchestrator.ai().start(slot, variant).is_err() {
            log::warn!("{slot:?} AI runs without its own thread");
        }
    }

    fn handle_hotkey(&mut self, hotkey: Hotkey) {
        match hotkey {
            Hotkey::VolumeUp | Hotkey::VolumeDown => {
                let step = if hotkey == Hotkey::VolumeUp {
                    VOLUME_STEP
                } else {
                    -VOLUME_STEP
                };
                self.master_volume = (self.master_volume + step).clamp(0.0, 1.0);
                self.orchestrator.play(AudioCommand::SetVolume {
                    channel: VolumeChannel::Master,
                    level: self.master_volume,
                });
            }
            Hotkey::ToggleMusic => {
                self.music_on = !self.music_on;
                let command = if self.music_on {
                    AudioCommand::PlayMusic {
                        name: cues::MAIN_THEME.to_owned(),
                        looped: true,
                        volume: 1.0,
                    }
                } else {
                    AudioCommand::StopMusic {
                        fade: Some(MUSIC_FADE),
                    }
                };
                self.orchestrator.play(command);
            }
            Hotkey::TogglePilot(slot) => {
                if !self.session.is_playing(slot) {
                    return;
                }
                self.previous[slot.index()] = Buttons::default();
                match self.session.toggle(slot) {
                    PlayerType::Ai(variant) => self.start_pilot(slot, variant),
                    PlayerType::Human => {
                        let _ = self.orchestrator.ai().stop(slot, SHUTDOWN_TIMEOUT);
                    }
                }
                log::info!("{slot:?} is now {:?}", self.session.player(slot));
            }
            Hotkey::ToggleCooperative => {
                self.session.cooperative = !self.session.cooperative;
            }
            Hotkey::Abandon => {
                self.execute(Command::AbandonGame);
                self.leave_game(Screen::Menu);
                self.orchestrator
                    .play(AudioCommand::StopMusic { fade: None });
            }
        }
    }

    fn emit_audio(&mut self) {
        for event in &self.events {
            cues::audio_cues(event, &mut self.cues);
        }
        for command in self.cues.drain(..) {
            self.orchestrator.play(command);
        }
    }

    fn follow_status(&mut self) {
        match query::status(&self.world) {
            GameStatus::Over => self.leave_game(Screen::GameOver {
                remaining: GAME_OVER_DURATION,
            }),
            GameStatus::Completed => self.leave_game(Screen::Victory {
                remaining: VICTORY_DURATION,
            }),
            GameStatus::Idle | GameStatus::Running => {}
        }
    }

    fn leave_game(&mut self, screen: Screen) {
        log::info!("leaving the game for {screen:?}");
        self.orchestrator.ai().stop_all(SHUTDOWN_TIMEOUT);
        let _ = self.orchestrator.clear_physics_queue();
        self.screen = screen;
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameInput, Hotkey, Screen, GAME_OVER_DURATION};
    use std::time::Duration;
    use wizard_maze_core::{Buttons, PlayerSlot};

    #[test]
    fn result_screens_count_down_to_the_menu() {
        let mut screen = Screen::GameOver {
            remaining: GAME_OVER_DURATION,
        };
        for _ in 0..4 {
            screen = screen.advance(Duration::from_secs(1), false);
            assert!(matches!(screen, Screen::GameOver { .. }));
        }
        assert_eq!(screen.advance(Duration::from_secs(1), false), Screen::Menu);
    }

    #[test]
    fn any_key_skips_a_result_screen() {
        let screen = Screen::Victory {
            remaining: Duration::from_secs(10),
        };
        assert_eq!(screen.advance(Duration::from_millis(16), true), Screen::Menu);
        assert_eq!(
            Screen::Playing.advance(Duration::from_secs(60), true),
            Screen::Playing
        );
    }

    #[test]
    fn hotkeys_and_buttons_both_count_as_keys() {
        assert!(!FrameInput::default().any_key());
        let mut input = FrameInput::default();
        input.buttons[PlayerSlot::Two.index()] = Buttons {
            left: true,
            ..Buttons::default()
        };
        assert!(input.any_key());
        let input = FrameInput {
            hotkeys: vec![Hotkey::ToggleMusic],
            ..FrameInput::default()
        };
        assert!(input.any_key());
    }
}
