#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bullet collision resolution, inline or on a background worker.
//!
//! The simulation thread copies bullets, players and enemies into a
//! [`PhysicsSnapshot`] and either resolves it immediately with
//! [`resolve_collisions`] or hands it to a [`PhysicsWorker`]. The worker keeps
//! only the most recent result; older unconsumed results are overwritten.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use wizard_maze_core::{
    bullet_hits, join_with_timeout, Collision, JoinOutcome, PhysicsResult, PhysicsSnapshot,
    Shooter, SpawnError, TargetType,
};

/// Number of snapshots the worker queue holds before the producer must evict.
pub const QUEUE_CAPACITY: usize = 10;

const RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Computes every collision in the snapshot.
///
/// Each bullet produces at most one record. A wall hit wins over everything
/// else, then the first visible player that is not the shooter, then the
/// first visible enemy. Bullets aimed at players only never hit enemies.
#[must_use]
pub fn resolve_collisions(snapshot: &PhysicsSnapshot) -> PhysicsResult {
    let mut collisions = Vec::new();

    for bullet in &snapshot.bullets {
        let (x, y) = (bullet.position.pixel_x(), bullet.position.pixel_y());
        if snapshot.layout.has_pixel(x, y) {
            collisions.push(Collision::BulletWall {
                bullet: bullet.bullet,
            });
            continue;
        }

        let player_hit = snapshot.players.iter().find(|player| {
            player.visible
                && bullet.shooter != Shooter::Player(player.slot)
                && bullet_hits(bullet.position, player.position)
        });
        if let Some(player) = player_hit {
            collisions.push(Collision::BulletPlayer {
                bullet: bullet.bullet,
                slot: player.slot,
            });
            continue;
        }

        if bullet.target != TargetType::Any {
            continue;
        }
        let enemy_hit = snapshot.enemies.iter().find(|enemy| {
            enemy.visible
                && bullet.shooter != Shooter::Enemy(enemy.enemy)
                && bullet_hits(bullet.position, enemy.position)
        });
        if let Some(enemy) = enemy_hit {
            collisions.push(Collision::BulletEnemy {
                bullet: bullet.bullet,
                enemy: enemy.enemy,
            });
        }
    }

    PhysicsResult {
        collisions,
        timestamp: snapshot.timestamp,
        frame: snapshot.frame,
        processed_bullets: snapshot.bullets.len(),
    }
}

/// What happened to a snapshot handed to the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The snapshot was queued without trouble.
    Queued,
    /// The queue was full; the oldest snapshot was dropped to make room.
    QueuedAfterEviction,
    /// The queue was full again before the worker took anything since the
    /// last eviction, or the retry failed; the snapshot was dropped.
    Saturated,
}

impl SubmitOutcome {
    /// Whether the producer should resolve this frame's collisions itself.
    ///
    /// Only a dropped snapshot needs it; a queued one is resolved by the worker.
    #[must_use]
    pub const fn needs_inline(self) -> bool {
        matches!(self, SubmitOutcome::Saturated)
    }
}

enum WorkerMessage {
    Check(PhysicsSnapshot),
    Shutdown,
}

#[derive(Debug, Default)]
struct Shared {
    latest: Mutex<Option<PhysicsResult>>,
    running: AtomicBool,
    processed: AtomicU64,
}

/// Background consumer of physics snapshots.
#[derive(Debug)]
pub struct PhysicsWorker {
    sender: Sender<WorkerMessage>,
    receiver: Receiver<WorkerMessage>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    congested: AtomicBool,
    /// `processed + 1` at the latest eviction; zero when none is pending.
    evicted_at: AtomicU64,
}

impl PhysicsWorker {
    /// Starts the worker thread.
    pub fn spawn() -> Result<Self, SpawnError> {
        let mut worker = Self::idle();
        let receiver = worker.receiver.clone();
        let shared = Arc::clone(&worker.shared);
        shared.running.store(true, Ordering::Release);

        let handle = thread::Builder::new()
            .name("physics".to_owned())
            .spawn(move || run(&receiver, &shared))
            .map_err(|source| SpawnError {
                worker: "physics",
                source,
            })?;
        worker.handle = Some(handle);
        log::info!("physics worker started");
        Ok(worker)
    }

    /// Creates the queue without a consumer thread.
    ///
    /// Snapshots pile up until the queue saturates; useful to exercise the
    /// producer-side fallback.
    #[must_use]
    pub fn idle() -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        Self {
            sender,
            receiver,
            shared: Arc::new(Shared::default()),
            handle: None,
            congested: AtomicBool::new(false),
            evicted_at: AtomicU64::new(0),
        }
    }

    /// Hands a copy of the snapshot to the worker without blocking.
    ///
    /// A full queue gets one eviction and retry. When it is full again before
    /// the worker has taken anything, the consumer is stalled and the
    /// snapshot is dropped for the producer to resolve inline.
    pub fn submit(&self, snapshot: &PhysicsSnapshot) -> SubmitOutcome {
        let mark = self.processed() + 1;
        let outcome = match self.sender.try_send(WorkerMessage::Check(snapshot.clone())) {
            Ok(()) => {
                self.evicted_at.store(0, Ordering::Relaxed);
                SubmitOutcome::Queued
            }
            Err(TrySendError::Full(_)) if self.evicted_at.load(Ordering::Relaxed) == mark => {
                SubmitOutcome::Saturated
            }
            Err(TrySendError::Full(message)) => {
                let _ = self.receiver.try_recv();
                match self.sender.try_send(message) {
                    Ok(()) => {
                        self.evicted_at.store(mark, Ordering::Relaxed);
                        SubmitOutcome::QueuedAfterEviction
                    }
                    Err(_) => SubmitOutcome::Saturated,
                }
            }
            Err(TrySendError::Disconnected(_)) => SubmitOutcome::Saturated,
        };

        let congested = outcome.needs_inline();
        if self.congested.swap(congested, Ordering::Relaxed) != congested {
            if congested {
                log::warn!("physics queue full ({outcome:?}); resolving collisions inline");
            } else {
                log::info!("physics queue drained; collisions resolved on the worker again");
            }
        }
        outcome
    }

    /// Removes and returns the latest unconsumed result.
    #[must_use]
    pub fn take_result(&self) -> Option<PhysicsResult> {
        self.shared.latest.lock().take()
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

    /// Number of snapshots waiting in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Number of snapshots the worker has resolved.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Drops every queued snapshot and returns how many were removed.
    pub fn clear_queue(&self) -> usize {
        let cleared = self.receiver.try_iter().count();
        if cleared > 0 {
            log::info!("cleared {cleared} queued physics snapshots");
        }
        cleared
    }

    /// Stops the worker, waiting at most `timeout` for it to exit.
    pub fn shutdown(&mut self, timeout: Duration) -> JoinOutcome {
        self.shared.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return JoinOutcome::Joined;
        };
        if let Err(TrySendError::Full(message)) = self.sender.try_send(WorkerMessage::Shutdown) {
            let _ = self.receiver.try_recv();
            let _ = self.sender.try_send(message);
        }

        let outcome = join_with_timeout(handle, timeout);
        match outcome {
            JoinOutcome::Joined => log::info!("physics worker stopped"),
            JoinOutcome::Panicked => log::error!("physics worker panicked before shutdown"),
            JoinOutcome::TimedOut => log::warn!("physics worker did not stop in time; abandoning it"),
        }
        outcome
    }
}

impl Drop for PhysicsWorker {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

fn run(receiver: &Receiver<WorkerMessage>, shared: &Shared) {
    while shared.running.load(Ordering::Acquire) {
        match receiver.recv_timeout(RECEIVE_TIMEOUT) {
            Ok(WorkerMessage::Check(snapshot)) => {
                let result = resolve_collisions(&snapshot);
                *shared.latest.lock() = Some(result);
                let _ = shared.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(WorkerMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    shared.running.store(false, Ordering::Release);
    log::debug!("physics worker loop exited");
}

#[cfg(test)]
mod tests {
    use super::{resolve_collisions, PhysicsWorker, SubmitOutcome, QUEUE_CAPACITY};
    use std::{sync::Arc, time::Duration};
    use wizard_maze_core::{
        BulletBody, BulletId, Collision, EnemyBody, EntityId, MazeLayout, PhysicsSnapshot,
        PixelPoint, PlayerBody, PlayerSlot, Shooter, TargetType,
    };

    fn snapshot(layout: MazeLayout) -> PhysicsSnapshot {
        PhysicsSnapshot {
            bullets: Vec::new(),
            players: Vec::new(),
            enemies: Vec::new(),
            layout: Arc::new(layout),
            timestamp: Duration::from_millis(500),
            frame: 30,
        }
    }

    fn bullet(id: u64, shooter: Shooter, x: f32, y: f32, target: TargetType) -> BulletBody {
        BulletBody {
            bullet: BulletId::new(id),
            shooter,
            position: PixelPoint::new(x, y),
            target,
        }
    }

    fn enemy(id: u32, x: f32, y: f32) -> EnemyBody {
        EnemyBody {
            enemy: EntityId::new(id),
            position: PixelPoint::new(x, y),
            visible: true,
        }
    }

    #[test]
    fn overlapping_enemy_yields_one_enemy_hit() {
        let mut input = snapshot(MazeLayout::open("open", 13, 8));
        input.bullets.push(bullet(1, Shooter::Player(PlayerSlot::One), 40.0, 34.0, TargetType::Any));
        input.enemies.push(enemy(7, 36.0, 30.0));

        let result = resolve_collisions(&input);
        assert_eq!(result.enemy_hits(), 1);
        assert_eq!(result.wall_hits(), 0);
        assert_eq!(result.frame, 30);
        assert_eq!(result.processed_bullets, 1);
    }

    #[test]
    fn walls_take_priority_over_characters() {
        let mut rows = vec![vec![0u8; 13]; 8];
        rows[3][3] = 1;
        let layout = MazeLayout::from_rows("walled", &rows).expect("layout builds");
        let mut input = snapshot(layout);
        input.bullets.push(bullet(2, Shooter::Player(PlayerSlot::One), 46.0, 34.0, TargetType::Any));
        input.enemies.push(enemy(3, 40.0, 30.0));

        let result = resolve_collisions(&input);
        assert_eq!(
            result.collisions,
            vec![Collision::BulletWall {
                bullet: BulletId::new(2)
            }]
        );
    }

    #[test]
    fn enemy_bullets_pass_through_enemies_and_hit_players() {
        let mut input = snapshot(MazeLayout::open("open", 13, 8));
        input.bullets.push(bullet(4, Shooter::Enemy(EntityId::new(1)), 40.0, 34.0, TargetType::Player));
        input.enemies.push(enemy(2, 36.0, 30.0));
        let quiet = resolve_collisions(&input);
        assert!(quiet.collisions.is_empty());

        input.players.push(PlayerBody {
            slot: PlayerSlot::Two,
            position: PixelPoint::new(38.0, 31.0),
            visible: true,
        });
        let result = resolve_collisions(&input);
        assert_eq!(
            result.collisions,
            vec![Collision::BulletPlayer {
                bullet: BulletId::new(4),
                slot: PlayerSlot::Two
            }]
        );
    }

    #[test]
    fn shooters_and_hidden_targets_are_never_hit() {
        let mut input = snapshot(MazeLayout::open("open", 13, 8));
        input.bullets.push(bullet(5, Shooter::Player(PlayerSlot::One), 40.0, 34.0, TargetType::Any));
        input.players.push(PlayerBody {
            slot: PlayerSlot::One,
            position: PixelPoint::new(36.0, 30.0),
            visible: true,
        });
        let mut hidden = enemy(9, 36.0, 30.0);
        hidden.visible = false;
        input.enemies.push(hidden);

        assert!(resolve_collisions(&input).collisions.is_empty());
    }

    #[test]
    fn full_queue_evicts_once_then_falls_back_inline() {
        let worker = PhysicsWorker::idle();
        let input = snapshot(MazeLayout::open("open", 13, 8));
        for _ in 0..QUEUE_CAPACITY {
            assert_eq!(worker.submit(&input), SubmitOutcome::Queued);
        }

        let evicted = worker.submit(&input);
        assert_eq!(evicted, SubmitOutcome::QueuedAfterEviction);
        assert!(!evicted.needs_inline(), "a queued snapshot is left to the worker");
        assert_eq!(worker.queue_len(), QUEUE_CAPACITY);

        let stalled = worker.submit(&input);
        assert_eq!(stalled, SubmitOutcome::Saturated);
        assert!(stalled.needs_inline());
        assert_eq!(worker.queue_len(), QUEUE_CAPACITY, "dropped snapshots are not queued");
        assert_eq!(worker.submit(&input), SubmitOutcome::Saturated);

        assert!(!worker.is_alive());
        assert_eq!(worker.clear_queue(), QUEUE_CAPACITY);
        assert_eq!(worker.submit(&input), SubmitOutcome::Queued);
    }
}
