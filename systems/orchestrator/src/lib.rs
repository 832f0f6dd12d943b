#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lifecycle of the background workers.
//!
//! The [`ThreadOrchestrator`] starts the physics and audio workers, owns the
//! AI controller, watches every worker's health and stops them all within a
//! bounded time. A worker that fails to start or dies is never fatal: the
//! affected subsystem is marked degraded and served inline for the rest of
//! the session unless it is explicitly restarted.

use std::{fmt, time::Duration};

use wizard_maze_core::{AudioCommand, JoinOutcome};
use wizard_maze_system_ai::AiController;
use wizard_maze_system_audio::{AudioBackend, AudioEngine, AudioWorker};
use wizard_maze_system_physics::PhysicsWorker;

/// Time granted to each worker to exit during shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds a fresh audio device, for the worker or for inline playback.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn AudioBackend> + Send>;

/// Subsystems that can run on a worker thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Collision resolution.
    Physics,
    /// Sound playback.
    Audio,
}

/// Liveness report of the background workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThreadStatus {
    /// The physics worker is running.
    pub physics_alive: bool,
    /// The audio worker is running.
    pub audio_alive: bool,
    /// Snapshots waiting for the physics worker.
    pub physics_queue: usize,
    /// The orchestrator has been started and not shut down.
    pub running: bool,
    /// AI decision threads that are running.
    pub active_ai: usize,
}

/// How each worker ended during shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Outcome for the physics worker.
    pub physics: JoinOutcome,
    /// Outcome for the audio worker.
    pub audio: JoinOutcome,
}

/// Owner of every background worker.
pub struct ThreadOrchestrator {
    physics: Option<PhysicsWorker>,
    audio: Option<AudioWorker>,
    inline_audio: Option<AudioEngine<Box<dyn AudioBackend>>>,
    ai: AiController,
    backend_factory: BackendFactory,
    running: bool,
    physics_degraded: bool,
    audio_degraded: bool,
}

impl fmt::Debug for ThreadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadOrchestrator")
            .field("status", &self.thread_status())
            .field("physics_degraded", &self.physics_degraded)
            .field("audio_degraded", &self.audio_degraded)
            .finish_non_exhaustive()
    }
}

impl ThreadOrchestrator {
    /// Creates an orchestrator that has not started any worker yet.
    #[must_use]
    pub fn new(backend_factory: BackendFactory, ai_seed: u64) -> Self {
        Self {
            physics: None,
            audio: None,
            inline_audio: None,
            ai: AiController::new(ai_seed),
            backend_factory,
            running: false,
            physics_degraded: false,
            audio_degraded: false,
        }
    }

    /// Starts the physics and audio workers.
    ///
    /// Failures are logged and leave the subsystem degraded.
    pub fn start(&mut self) {
        self.running = true;
        self.restart(Subsystem::Physics);
        self.restart(Subsystem::Audio);
    }

    /// Starts a fresh worker for the subsystem, stopping any previous one.
    pub fn restart(&mut self, subsystem: Subsystem) {
        match subsystem {
            Subsystem::Physics => {
                if let Some(mut worker) = self.physics.take() {
                    let _ = worker.shutdown(SHUTDOWN_TIMEOUT);
                }
                match PhysicsWorker::spawn() {
                    Ok(worker) => {
                        self.physics = Some(worker);
                        self.physics_degraded = false;
                    }
                    Err(error) => self.degrade(Subsystem::Physics, &error.to_string()),
                }
            }
            Subsystem::Audio => {
                if let Some(mut worker) = self.audio.take() {
                    let _ = worker.shutdown(SHUTDOWN_TIMEOUT);
                }
                match AudioWorker::spawn((self.backend_factory)()) {
                    Ok(worker) => {
                        self.audio = Some(worker);
                        self.inline_audio = None;
                        self.audio_degraded = false;
                    }
                    Err(error) => self.degrade(Subsystem::Audio, &error.to_string()),
                }
            }
        }
    }

    /// Checks every worker and degrades the subsystems whose worker died.
    pub fn health_check(&mut self) -> ThreadStatus {
        if self.running {
            if self.physics.as_ref().is_some_and(|worker| !worker.is_alive()) {
                self.physics = None;
                self.degrade(Subsystem::Physics, "worker stopped unexpectedly");
            }
            if self.audio.as_ref().is_some_and(|worker| !worker.is_alive()) {
                self.audio = None;
                self.degrade(Subsystem::Audio, "worker stopped unexpectedly");
            }
        }
        self.thread_status()
    }

    /// Whether the subsystem is served inline.
    #[must_use]
    pub const fn is_degraded(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::Physics => self.physics_degraded,
            Subsystem::Audio => self.audio_degraded,
        }
    }

    /// The physics worker, while it is usable.
    #[must_use]
    pub fn physics(&self) -> Option<&PhysicsWorker> {
        self.physics.as_ref().filter(|worker| worker.is_alive())
    }

    /// AI controller for both player slots.
    pub fn ai(&mut self) -> &mut AiController {
        &mut self.ai
    }

    /// Plays an audio command on the worker, or inline when it is gone.
    pub fn play(&mut self, command: AudioCommand) {
        let command = match self.audio.as_ref() {
            Some(worker) if worker.is_alive() && worker.send(command.clone()) => return,
            _ => command,
        };
        if self.running && !self.audio_degraded {
            self.audio = None;
            self.degrade(Subsystem::Audio, "worker stopped unexpectedly");
        }
        if let Some(engine) = self.inline_audio.as_mut() {
            engine.process(command);
        }
    }

    /// Liveness of every worker.
    #[must_use]
    pub fn thread_status(&self) -> ThreadStatus {
        ThreadStatus {
            physics_alive: self.physics.as_ref().is_some_and(PhysicsWorker::is_alive),
            audio_alive: self.audio.as_ref().is_some_and(AudioWorker::is_alive),
            physics_queue: self.physics.as_ref().map_or(0, PhysicsWorker::queue_len),
            running: self.running,
            active_ai: self.ai.active_workers(),
        }
    }

    /// Drops every snapshot waiting for the physics worker.
    pub fn clear_physics_queue(&self) -> usize {
        self.physics.as_ref().map_or(0, PhysicsWorker::clear_queue)
    }

    /// Stops the AI, physics and audio workers, in that order.
    ///
    /// Each worker gets at most `timeout`; stragglers are abandoned.
    pub fn shutdown(&mut self, timeout: Duration) -> ShutdownReport {
        self.running = false;
        self.ai.stop_all(timeout);
        let physics = self
            .physics
            .take()
            .map_or(JoinOutcome::Joined, |mut worker| worker.shutdown(timeout));
        let audio = self
            .audio
            .take()
            .map_or(JoinOutcome::Joined, |mut worker| worker.shutdown(timeout));
        self.inline_audio = None;
        log::info!("workers shut down (physics: {physics:?}, audio: {audio:?})");
        ShutdownReport { physics, audio }
    }

    fn degrade(&mut self, subsystem: Subsystem, reason: &str) {
        let already = match subsystem {
            Subsystem::Physics => std::mem::replace(&mut self.physics_degraded, true),
            Subsystem::Audio => std::mem::replace(&mut self.audio_degraded, true),
        };
        if subsystem == Subsystem::Audio && self.inline_audio.is_none() {
            self.inline_audio = Some(AudioEngine::new((self.backend_factory)()));
        }
        if !already {
            log::error!("{subsystem:?} {reason}; continuing inline for this session");
        }
    }
}

impl Drop for ThreadOrchestrator {
    fn drop(&mut self) {
        if self.running {
            let _ = self.shutdown(SHUTDOWN_TIMEOUT);
        }
    }
}
