use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use wizard_maze_core::{
    BulletBody, BulletId, EnemyBody, EntityId, JoinOutcome, MazeLayout, PhysicsResult,
    PhysicsSnapshot, PixelPoint, PlayerSlot, Shooter, TargetType,
};
use wizard_maze_system_physics::{resolve_collisions, PhysicsWorker, SubmitOutcome};

fn scene(frame: u64) -> PhysicsSnapshot {
    PhysicsSnapshot {
        bullets: vec![BulletBody {
            bullet: BulletId::new(frame),
            shooter: Shooter::Player(PlayerSlot::One),
            position: PixelPoint::new(64.0, 44.0),
            target: TargetType::Any,
        }],
        players: Vec::new(),
        enemies: vec![EnemyBody {
            enemy: EntityId::new(3),
            position: PixelPoint::new(60.0, 40.0),
            visible: true,
        }],
        layout: Arc::new(MazeLayout::fallback()),
        timestamp: Duration::from_millis(frame * 16),
        frame,
    }
}

fn wait_for_result(worker: &PhysicsWorker) -> Option<PhysicsResult> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(result) = worker.take_result() {
            return Some(result);
        }
        thread::sleep(Duration::from_millis(2));
    }
    None
}

#[test]
fn worker_publishes_the_same_result_as_inline_resolution() {
    let mut worker = PhysicsWorker::spawn().expect("physics worker starts");
    assert!(worker.is_alive());

    let input = scene(1);
    assert_eq!(worker.submit(&input), SubmitOutcome::Queued);
    let published = wait_for_result(&worker).expect("worker publishes a result");
    assert_eq!(published, resolve_collisions(&input));
    assert!(worker.take_result().is_none(), "results are consumed once");

    assert_eq!(worker.shutdown(Duration::from_secs(1)), JoinOutcome::Joined);
    assert!(!worker.is_alive());
}

#[test]
fn only_the_latest_result_is_kept() {
    let mut worker = PhysicsWorker::spawn().expect("physics worker starts");
    for frame in 1..=5 {
        let _ = worker.submit(&scene(frame));
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while worker.processed() < 5 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    let latest = worker.take_result().expect("a result is available");
    assert_eq!(latest.frame, 5, "older unconsumed results are overwritten");

    assert_eq!(worker.shutdown(Duration::from_secs(1)), JoinOutcome::Joined);
}
