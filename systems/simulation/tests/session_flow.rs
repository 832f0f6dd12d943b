use std::time::Duration;

use wizard_maze_core::{Buttons, Event, GameConfig, PlayerSlot, Tuning};
use wizard_maze_system_ai::AiVariant;
use wizard_maze_system_audio::{AudioBackend, SilentBackend};
use wizard_maze_system_simulation::{FrameInput, GameMode, Hotkey, Screen, Session, SimulationLoop};
use wizard_maze_world::{parse_level, query, GameStatus, World};

const FRAME: Duration = Duration::from_millis(16);

fn simulation(seed: u64) -> SimulationLoop {
    let layout = parse_level(
        "Level1",
        "3222222222222\n1002000002010\n1020100010210\n1000020200010\n\
         1021000012010\n1000002000010\n1222222222230\n0000000000000\n",
    )
    .expect("level one parses");
    let world = World::new(vec![layout], Tuning::from_config(&GameConfig::default()), seed);
    SimulationLoop::new(
        world,
        Box::new(|| Box::new(SilentBackend::default()) as Box<dyn AudioBackend>),
        seed,
    )
}

fn held(buttons: Buttons) -> FrameInput {
    FrameInput {
        buttons: [buttons, Buttons::default()],
        hotkeys: Vec::new(),
    }
}

fn run_until_started(simulation: &mut SimulationLoop) {
    for _ in 0..200 {
        let started = simulation
            .step(FRAME, &FrameInput::default())
            .iter()
            .any(|event| matches!(event, Event::LevelStarted { .. }));
        if started {
            return;
        }
    }
    panic!("the level start delay never elapsed");
}

#[test]
fn menu_frames_do_nothing_until_a_game_starts() {
    let mut simulation = simulation(1);
    assert_eq!(simulation.screen(), Screen::Menu);
    for _ in 0..10 {
        assert!(simulation.step(FRAME, &held(Buttons { fire: true, ..Buttons::default() })).is_empty());
    }
    assert_eq!(query::status(simulation.world()), GameStatus::Idle);

    let events = simulation.start_game(Session::for_mode(GameMode::Solo)).to_vec();
    assert!(events.iter().any(|event| matches!(event, Event::GameStarted { multiplayer: false })));
    assert!(events.iter().any(|event| matches!(event, Event::LevelInitialized { stage: 0, .. })));
    assert_eq!(simulation.screen(), Screen::Playing);

    let status = simulation.thread_status();
    assert!(status.physics_alive && status.audio_alive);
    let _ = simulation.shutdown();
}

#[test]
fn holding_fire_shoots_once() {
    let mut simulation = simulation(2);
    let _ = simulation.start_game(Session::for_mode(GameMode::Solo));
    run_until_started(&mut simulation);
    assert!(query::is_caged(simulation.world(), PlayerSlot::One));

    let left_cage = simulation
        .step(FRAME, &held(Buttons { up: true, ..Buttons::default() }))
        .iter()
        .any(|event| matches!(event, Event::PlayerLeftCage { slot: PlayerSlot::One }));
    assert!(left_cage, "a held move key opens the cage");

    let mut shots = 0;
    for _ in 0..30 {
        shots += simulation
            .step(FRAME, &held(Buttons { fire: true, ..Buttons::default() }))
            .iter()
            .filter(|event| matches!(event, Event::PlayerFired { slot: PlayerSlot::One }))
            .count();
    }
    assert_eq!(shots, 1, "fire only counts when the button goes down");
    let _ = simulation.shutdown();
}

#[test]
fn two_ai_players_keep_the_game_running() {
    let mut simulation = simulation(3);
    let _ = simulation.start_game(Session::for_mode(GameMode::AiVsAi(
        AiVariant::Aggressive,
        AiVariant::FixedPost,
    )));
    assert_eq!(simulation.thread_status().active_ai, 2);

    let mut left_cage = [false; 2];
    for _ in 0..600 {
        for event in simulation.step(FRAME, &FrameInput::default()) {
            if let Event::PlayerLeftCage { slot } = event {
                left_cage[slot.index()] = true;
            }
        }
        std::thread::sleep(Duration::from_millis(1));
        if simulation.screen() != Screen::Playing {
            break;
        }
    }
    assert!(left_cage.iter().any(|left| *left), "the AI finds its way out of the cage");
    assert!(simulation.stats().frames > 0);

    let report = simulation.shutdown();
    assert_eq!(report.physics, wizard_maze_core::JoinOutcome::Joined);
    assert_eq!(simulation.thread_status().active_ai, 0);
    assert!(!simulation.thread_status().running);
}

#[test]
fn pilots_can_be_swapped_mid_game_and_the_game_abandoned() {
    let mut simulation = simulation(4);
    let _ = simulation.start_game(Session::for_mode(GameMode::HumanVsHuman));
    run_until_started(&mut simulation);
    assert_eq!(simulation.thread_status().active_ai, 0);

    let toggle = FrameInput {
        hotkeys: vec![Hotkey::TogglePilot(PlayerSlot::Two), Hotkey::VolumeDown],
        ..FrameInput::default()
    };
    let _ = simulation.step(FRAME, &toggle);
    assert!(simulation.session().player(PlayerSlot::Two).is_ai());
    assert_eq!(simulation.thread_status().active_ai, 1);
    assert!((simulation.master_volume() - 0.9).abs() < 1e-6);

    let abandon = FrameInput {
        hotkeys: vec![Hotkey::Abandon],
        ..FrameInput::default()
    };
    let _ = simulation.step(FRAME, &abandon);
    assert_eq!(simulation.screen(), Screen::Menu);
    assert_eq!(query::status(simulation.world()), GameStatus::Idle);
    assert_eq!(simulation.thread_status().active_ai, 0);
    let _ = simulation.shutdown();
}
