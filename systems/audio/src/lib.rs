#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fire-and-forget sound playback.
//!
//! The simulation never waits on audio. Commands are queued to an
//! [`AudioWorker`] that owns an [`AudioEngine`]; when the worker is gone the
//! same engine can be driven inline. Playback failures are logged and never
//! reach gameplay.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use wizard_maze_core::{join_with_timeout, AudioCommand, JoinOutcome, SpawnError, VolumeChannel};

const RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Failures reported by an [`AudioBackend`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The asset could not be found or decoded.
    #[error("failed to load sound `{name}`: {reason}")]
    Load {
        /// Asset name.
        name: String,
        /// Backend-specific detail.
        reason: String,
    },
    /// The device refused to play the asset.
    #[error("failed to play `{name}`: {reason}")]
    Playback {
        /// Asset name.
        name: String,
        /// Backend-specific detail.
        reason: String,
    },
}

/// Output device driven by the [`AudioEngine`].
///
/// Volumes handed to the backend are already composed with the channel and
/// master levels.
pub trait AudioBackend: Send {
    /// Loads a sound effect so it can be played later.
    fn load_sound(&mut self, name: &str) -> Result<(), AudioError>;

    /// Plays a loaded sound effect once.
    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AudioError>;

    /// Starts background music, replacing whatever was playing.
    fn play_music(&mut self, name: &str, looped: bool, volume: f32) -> Result<(), AudioError>;

    /// Stops background music, optionally fading out.
    fn stop_music(&mut self, fade: Option<Duration>);

    /// Adjusts the volume of the playing music.
    fn set_music_volume(&mut self, volume: f32);

    /// Whether music is still audible.
    fn is_music_playing(&self) -> bool;
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn load_sound(&mut self, name: &str) -> Result<(), AudioError> {
        (**self).load_sound(name)
    }

    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AudioError> {
        (**self).play_sound(name, volume)
    }

    fn play_music(&mut self, name: &str, looped: bool, volume: f32) -> Result<(), AudioError> {
        (**self).play_music(name, looped, volume)
    }

    fn stop_music(&mut self, fade: Option<Duration>) {
        (**self).stop_music(fade);
    }

    fn set_music_volume(&mut self, volume: f32) {
        (**self).set_music_volume(volume);
    }

    fn is_music_playing(&self) -> bool {
        (**self).is_music_playing()
    }
}

/// Backend for headless runs: accepts everything and produces no sound.
///
/// Looped music keeps "playing" until stopped; one-shot music is reported
/// finished immediately.
#[derive(Clone, Debug, Default)]
pub struct SilentBackend {
    music_looped: Option<bool>,
    sounds_played: u64,
}

impl SilentBackend {
    /// Number of sound effects accepted so far.
    #[must_use]
    pub const fn sounds_played(&self) -> u64 {
        self.sounds_played
    }
}

impl AudioBackend for SilentBackend {
    fn load_sound(&mut self, _name: &str) -> Result<(), AudioError> {
        Ok(())
    }

    fn play_sound(&mut self, _name: &str, _volume: f32) -> Result<(), AudioError> {
        self.sounds_played += 1;
        Ok(())
    }

    fn play_music(&mut self, _name: &str, looped: bool, _volume: f32) -> Result<(), AudioError> {
        self.music_looped = Some(looped);
        Ok(())
    }

    fn stop_music(&mut self, _fade: Option<Duration>) {
        self.music_looped = None;
    }

    fn set_music_volume(&mut self, _volume: f32) {}

    fn is_music_playing(&self) -> bool {
        self.music_looped == Some(true)
    }
}

/// Command processor owning the sound cache and the volume channels.
#[derive(Debug)]
pub struct AudioEngine<B> {
    backend: B,
    cache: HashSet<String>,
    master: f32,
    effects: f32,
    music: f32,
    current_music: Option<String>,
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Creates an engine with every channel at full volume.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: HashSet::new(),
            master: 1.0,
            effects: 1.0,
            music: 1.0,
            current_music: None,
        }
    }

    /// Executes one command. Failures are logged and swallowed.
    pub fn process(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::PlaySound { name, volume } => self.play_sound(&name, volume),
            AudioCommand::PlayMusic {
                name,
                looped,
                volume,
            } => self.play_music(name, looped, volume),
            AudioCommand::StopMusic { fade } => {
                self.backend.stop_music(fade);
                self.current_music = None;
            }
            AudioCommand::SetVolume { channel, level } => self.set_volume(channel, level),
            AudioCommand::Preload { names } => {
                let loaded = names.iter().filter(|name| self.ensure_loaded(name)).count();
                log::debug!("preloaded {loaded} of {} sounds", names.len());
            }
        }
    }

    /// Forgets the current track once the backend reports it finished.
    pub fn poll_music(&mut self) {
        if self.current_music.is_some() && !self.backend.is_music_playing() {
            if let Some(name) = self.current_music.take() {
                log::debug!("music `{name}` finished");
            }
        }
    }

    /// Name of the track that is playing, if any.
    #[must_use]
    pub fn current_music(&self) -> Option<&str> {
        self.current_music.as_deref()
    }

    /// Number of sound effects in the cache.
    #[must_use]
    pub fn cached_sounds(&self) -> usize {
        self.cache.len()
    }

    /// Current level of one channel.
    #[must_use]
    pub const fn volume(&self, channel: VolumeChannel) -> f32 {
        match channel {
            VolumeChannel::Master => self.master,
            VolumeChannel::Effects => self.effects,
            VolumeChannel::Music => self.music,
        }
    }

    /// Read access to the device.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_loaded(&mut self, name: &str) -> bool {
        if self.cache.contains(name) {
            return false;
        }
        match self.backend.load_sound(name) {
            Ok(()) => self.cache.insert(name.to_owned()),
            Err(error) => {
                log::warn!("{error}");
                false
            }
        }
    }

    fn play_sound(&mut self, name: &str, volume: f32) {
        let _ = self.ensure_loaded(name);
        if !self.cache.contains(name) {
            return;
        }
        let level = volume * self.effects * self.master;
        if let Err(error) = self.backend.play_sound(name, level) {
            log::warn!("{error}");
        }
    }

    fn play_music(&mut self, name: String, looped: bool, volume: f32) {
        self.backend.stop_music(None);
        self.current_music = None;
        let level = volume * self.music * self.master;
        match self.backend.play_music(&name, looped, level) {
            Ok(()) => self.current_music = Some(name),
            Err(error) => log::warn!("{error}"),
        }
    }

    fn set_volume(&mut self, channel: VolumeChannel, level: f32) {
        let level = level.clamp(0.0, 1.0);
        match channel {
            VolumeChannel::Master => self.master = level,
            VolumeChannel::Effects => self.effects = level,
            VolumeChannel::Music => self.music = level,
        }
        if channel != VolumeChannel::Effects && self.backend.is_music_playing() {
            self.backend.set_music_volume(self.music * self.master);
        }
    }
}

enum WorkerMessage {
    Play(AudioCommand),
    Shutdown,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    processed: AtomicU64,
}

/// Background owner of an [`AudioEngine`].
#[derive(Debug)]
pub struct AudioWorker {
    sender: Sender<WorkerMessage>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Starts the worker thread around `backend`.
    pub fn spawn<B: AudioBackend + 'static>(backend: B) -> Result<Self, SpawnError> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(Shared::default());
        shared.running.store(true, Ordering::Release);

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("audio".to_owned())
            .spawn(move || run(AudioEngine::new(backend), &receiver, &worker_shared))
            .map_err(|source| {
                shared.running.store(false, Ordering::Release);
                SpawnError {
                    worker: "audio",
                    source,
                }
            })?;
        log::info!("audio worker started");
        Ok(Self {
            sender,
            shared,
            handle: Some(handle),
        })
    }

    /// Queues a command. Returns `false` when the worker is gone.
    pub fn send(&self, command: AudioCommand) -> bool {
        self.sender.send(WorkerMessage::Play(command)).is_ok()
    }

    /// Whether the consumer thread is running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of commands waiting in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Number of commands the worker has executed.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Stops the worker, waiting at most `timeout` for it to exit.
    pub fn shutdown(&mut self, timeout: Duration) -> JoinOutcome {
        let Some(handle) = self.handle.take() else {
            return JoinOutcome::Joined;
        };
        let _ = self.sender.send(WorkerMessage::Shutdown);

        let outcome = join_with_timeout(handle, timeout);
        match outcome {
            JoinOutcome::Joined => log::info!("audio worker stopped"),
            JoinOutcome::Panicked => log::error!("audio worker panicked before shutdown"),
            JoinOutcome::TimedOut => log::warn!("audio worker did not stop in time; abandoning it"),
        }
        self.shared.running.store(false, Ordering::Release);
        outcome
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.sender.send(WorkerMessage::Shutdown);
        }
    }
}

fn run<B: AudioBackend>(
    mut engine: AudioEngine<B>,
    receiver: &Receiver<WorkerMessage>,
    shared: &Shared,
) {
    loop {
        match receiver.recv_timeout(RECEIVE_TIMEOUT) {
            Ok(WorkerMessage::Play(command)) => {
                engine.process(command);
                let _ = shared.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(WorkerMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => engine.poll_music(),
        }
    }
    engine.process(AudioCommand::StopMusic { fade: None });
    shared.running.store(false, Ordering::Release);
    log::debug!("audio worker loop exited");
}
