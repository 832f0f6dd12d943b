#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Wizard Maze sessions without a display.

use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use wizard_maze_core::{Event, GameConfig, Tuning};
use wizard_maze_system_ai::AiVariant;
use wizard_maze_system_audio::{AudioBackend, AudioError};
use wizard_maze_system_simulation::{
    FrameInput, PlayerType, Screen, Session, SimulationLoop,
};
use wizard_maze_world::{load_levels_from_dir, query, World};

const DEFAULT_CONFIG: &str = "config/game.cfg";

/// Controller choices for a player slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Pilot {
    /// Nobody presses any button.
    Idle,
    /// Balanced AI.
    Balanced,
    /// Aggressive AI.
    Aggressive,
    /// AI that defends a fixed post.
    FixedPost,
}

impl Pilot {
    const fn player_type(self) -> PlayerType {
        match self {
            Pilot::Idle => PlayerType::Human,
            Pilot::Balanced => PlayerType::Ai(AiVariant::Balanced),
            Pilot::Aggressive => PlayerType::Ai(AiVariant::Aggressive),
            Pilot::FixedPost => PlayerType::Ai(AiVariant::FixedPost),
        }
    }
}

/// Runs a headless Wizard Maze game and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "wizard-maze", version, about)]
struct Cli {
    /// Directory holding the `LevelN.txt` mazes.
    #[arg(long, default_value = "levels")]
    levels: PathBuf,
    /// Key-value or TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frames to simulate before stopping.
    #[arg(long, default_value_t = 3_600)]
    frames: u64,
    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Sleep between frames so AI threads see real time pass.
    #[arg(long)]
    realtime: bool,
    /// Seed for the world and the AI.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Controller of player one.
    #[arg(long, value_enum, default_value_t = Pilot::Aggressive)]
    player_one: Pilot,
    /// Controller of player two; omit for a single-player game.
    #[arg(long, value_enum)]
    player_two: Option<Pilot>,
    /// Let AI players coordinate.
    #[arg(long)]
    cooperative: bool,
    /// Log filter, overriding `RUST_LOG`.
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

/// Audio device that only reports what it would play.
#[derive(Debug, Default)]
struct LogBackend {
    music: Option<String>,
}

impl AudioBackend for LogBackend {
    fn load_sound(&mut self, name: &str) -> Result<(), AudioError> {
        log::trace!("load {name}");
        Ok(())
    }

    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AudioError> {
        log::debug!("sound {name} at {volume:.2}");
        Ok(())
    }

    fn play_music(&mut self, name: &str, looped: bool, volume: f32) -> Result<(), AudioError> {
        log::debug!("music {name} (looped: {looped}) at {volume:.2}");
        self.music = looped.then(|| name.to_owned());
        Ok(())
    }

    fn stop_music(&mut self, fade: Option<Duration>) {
        if let Some(name) = self.music.take() {
            log::debug!("music {name} stopped (fade: {fade:?})");
        }
    }

    fn set_music_volume(&mut self, volume: f32) {
        log::trace!("music volume {volume:.2}");
    }

    fn is_music_playing(&self) -> bool {
        self.music.is_some()
    }
}

#[derive(Debug, Default)]
struct Tally {
    shots: u32,
    kills: u32,
    deaths: u32,
    stages: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::PlayerFired { .. } => self.shots += 1,
                Event::EnemyKilled { .. } => self.kills += 1,
                Event::PlayerKilled { .. } => self.deaths += 1,
                Event::LevelInitialized { .. } => self.stages += 1,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    let levels = load_levels_from_dir(&cli.levels);
    log::info!("{} level layouts available", levels.len());

    let world = World::new(levels, Tuning::from_config(&config), cli.seed);
    println!("Wizard Maze");

    let mut session = Session::default().configured(&config);
    session.players = [
        cli.player_one.player_type(),
        cli.player_two.map_or(PlayerType::Human, Pilot::player_type),
    ];
    session.multiplayer = cli.player_two.is_some();
    session.cooperative |= cli.cooperative;

    let mut simulation = SimulationLoop::new(
        world,
        Box::new(|| Box::new(LogBackend::default()) as Box<dyn AudioBackend>),
        cli.seed,
    );
    let mut tally = Tally::default();
    tally.record(simulation.start_game(session));

    let frame = Duration::from_millis(cli.frame_ms.max(1));
    let input = FrameInput::default();
    let started = Instant::now();
    for _ in 0..cli.frames {
        tally.record(simulation.step(frame, &input));
        if simulation.screen() != Screen::Playing {
            break;
        }
        if cli.realtime {
            thread::sleep(frame);
        }
    }

    print_summary(&simulation, &tally, started.elapsed());
    let report = simulation.shutdown();
    log::info!("shutdown: {report:?}");
    Ok(())
}

fn init_logging(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        let _ = builder.filter_level(level);
    }
    builder.init();
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(GameConfig::load_or_default(Path::new(DEFAULT_CONFIG))),
    }
}

fn print_summary(simulation: &SimulationLoop, tally: &Tally, wall: Duration) {
    let world = simulation.world();
    let stats = simulation.stats();
    let status = simulation.thread_status();
    let progress = query::kill_progress(world);

    println!("screen:      {:?}", simulation.screen());
    println!("status:      {:?}", query::status(world));
    println!(
        "stage:       {} ({:?}), {}/{} kills",
        query::stage(world) + 1,
        query::phase(world),
        progress.killed,
        progress.required
    );
    for (index, score) in query::scores(world).iter().enumerate() {
        if let Some(score) = score {
            println!("player {}:    {score} points", index + 1);
        }
    }
    println!(
        "events:      {} shots, {} kills, {} deaths, {} stages",
        tally.shots, tally.kills, tally.deaths, tally.stages
    );
    println!(
        "frames:      {} in {:.2?} simulated, {:.2?} wall",
        stats.frames,
        simulation.clock(),
        wall
    );
    println!(
        "physics:     {} threaded, {} inline, {} results applied",
        stats.threaded_batches, stats.inline_batches, stats.applied_results
    );
    println!(
        "workers:     physics {}, audio {}, {} AI",
        alive(status.physics_alive),
        alive(status.audio_alive),
        status.active_ai
    );
}

const fn alive(flag: bool) -> &'static str {
    if flag {
        "alive"
    } else {
        "stopped"
    }
}
