use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use wizard_maze_core::{
    join_with_timeout, Action, GameStateSnapshot, JoinOutcome, PlayerSlot, SpawnError,
};

use crate::{AiVariant, DecisionEngine};

/// Snapshots an AI inbox holds before the oldest one is evicted.
pub const SNAPSHOT_QUEUE_CAPACITY: usize = 4;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

enum Inbox {
    State(Box<GameStateSnapshot>),
    Shutdown,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    decisions: AtomicU64,
}

/// Background thread running one [`DecisionEngine`].
#[derive(Debug)]
pub struct AiWorker {
    slot: PlayerSlot,
    variant: AiVariant,
    inbox: Sender<Inbox>,
    inbox_drain: Receiver<Inbox>,
    actions: Receiver<Action>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl AiWorker {
    /// Starts a worker deciding for `slot`.
    pub fn spawn(slot: PlayerSlot, variant: AiVariant, seed: u64) -> Result<Self, SpawnError> {
        let (inbox, inbox_drain) = bounded(SNAPSHOT_QUEUE_CAPACITY);
        let (outbox, actions) = unbounded();
        let shared = Arc::new(Shared::default());
        shared.running.store(true, Ordering::Release);

        let engine = DecisionEngine::new(slot, variant, seed);
        let receiver = inbox_drain.clone();
        let worker_shared = Arc::clone(&shared);
        let name = match slot {
            PlayerSlot::One => "ai-player-1",
            PlayerSlot::Two => "ai-player-2",
        };
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run(engine, &receiver, &outbox, &worker_shared))
            .map_err(|source| {
                shared.running.store(false, Ordering::Release);
                SpawnError { worker: name, source }
            })?;
        log::info!("{slot:?} AI worker started ({variant:?})");

        Ok(Self {
            slot,
            variant,
            inbox,
            inbox_drain,
            actions,
            shared,
            handle: Some(handle),
        })
    }

    /// Slot the worker plays for.
    #[must_use]
    pub const fn slot(&self) -> PlayerSlot {
        self.slot
    }

    /// Behaviour profile of the engine.
    #[must_use]
    pub const fn variant(&self) -> AiVariant {
        self.variant
    }

    /// Hands a snapshot to the worker, evicting the oldest when the inbox is
    /// full. Returns `false` when the worker is gone.
    pub fn push(&self, snapshot: GameStateSnapshot) -> bool {
        match self.inbox.try_send(Inbox::State(Box::new(snapshot))) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                let _ = self.inbox_drain.try_recv();
                !matches!(self.inbox.try_send(message), Err(TrySendError::Disconnected(_)))
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Removes every decision produced since the previous call.
    pub fn drain(&self) -> Vec<Action> {
        self.actions.try_iter().collect()
    }

    /// Whether the decision thread is running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of decisions taken so far.
    #[must_use]
    pub fn decisions(&self) -> u64 {
        self.shared.decisions.load(Ordering::Relaxed)
    }

    /// Stops the worker, waiting at most `timeout` for it to exit.
    pub fn stop(&mut self, timeout: Duration) -> JoinOutcome {
        self.shared.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return JoinOutcome::Joined;
        };
        if let Err(TrySendError::Full(message)) = self.inbox.try_send(Inbox::Shutdown) {
            let _ = self.inbox_drain.try_recv();
            let _ = self.inbox.try_send(message);
        }

        let outcome = join_with_timeout(handle, timeout);
        match outcome {
            JoinOutcome::Joined => log::info!("{:?} AI worker stopped", self.slot),
            JoinOutcome::Panicked => log::error!("{:?} AI worker panicked", self.slot),
            JoinOutcome::TimedOut => {
                log::warn!("{:?} AI worker did not stop in time; abandoning it", self.slot);
            }
        }
        outcome
    }
}

impl Drop for AiWorker {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

fn run(
    mut engine: DecisionEngine,
    inbox: &Receiver<Inbox>,
    outbox: &Sender<Action>,
    shared: &Shared,
) {
    let interval = engine.variant().decision_interval();
    let mut last_decision = Instant::now();
    let mut last_snapshot = Instant::now();
    let snapshot_clock = |engine: &DecisionEngine, since: Instant| engine.clock() + since.elapsed();

    'outer: while shared.running.load(Ordering::Acquire) {
        let action = match inbox.recv_timeout(POLL_INTERVAL) {
            Ok(Inbox::State(snapshot)) => {
                engine.observe(*snapshot);
                for message in inbox.try_iter() {
                    match message {
                        Inbox::State(newer) => engine.observe(*newer),
                        Inbox::Shutdown => break 'outer,
                    }
                }
                last_snapshot = Instant::now();
                engine.decide()
            }
            Ok(Inbox::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if !engine.has_state() || last_decision.elapsed() < interval {
                    continue;
                }
                let now = snapshot_clock(&engine, last_snapshot);
                last_snapshot = Instant::now();
                engine.tick(now)
            }
        };

        last_decision = Instant::now();
        let _ = shared.decisions.fetch_add(1, Ordering::Relaxed);
        if outbox.send(action).is_err() {
            break;
        }
    }
    shared.running.store(false, Ordering::Release);
    log::debug!("{:?} AI loop exited", engine.slot());
}

#[cfg(test)]
mod tests {
    use super::AiWorker;
    use crate::AiVariant;
    use std::{sync::Arc, thread, time::Duration};
    use wizard_maze_core::{
        Action, CellCoord, Direction, GameStateSnapshot, JoinOutcome, MazeLayout, PlayerSlot,
    };

    /// Maze whose cell (3, 3) only opens to the east.
    fn dead_end() -> Arc<MazeLayout> {
        let mut rows = vec![vec![0u8; 13]; 8];
        rows[3][2] = 1;
        rows[2][3] = 2;
        rows[3][3] = 2;
        Arc::new(MazeLayout::from_rows("dead-end", &rows).expect("layout builds"))
    }

    #[test]
    fn frame_rate_snapshots_still_free_a_pinned_player() {
        let layout = dead_end();
        let cell = CellCoord::new(3, 3);
        assert!(layout.is_open(cell, Direction::East));
        assert!(!layout.is_open(cell, Direction::West));

        let mut worker =
            AiWorker::spawn(PlayerSlot::One, AiVariant::Balanced, 21).expect("worker starts");
        let mut actions = Vec::new();
        for frame in 1..=90u64 {
            let pushed = worker.push(GameStateSnapshot {
                slot: PlayerSlot::One,
                elapsed: Duration::from_millis(frame * 16),
                position: cell.top_left(),
                direction: Direction::North,
                in_cage: false,
                has_bullet: false,
                cooperative: false,
                enemies: Vec::new(),
                bullets: Vec::new(),
                teammate: None,
                layout: Arc::clone(&layout),
            });
            assert!(pushed, "the worker accepts snapshots");
            thread::sleep(Duration::from_millis(16));
            actions.extend(worker.drain());
        }
        thread::sleep(Duration::from_millis(50));
        actions.extend(worker.drain());
        assert_eq!(worker.stop(Duration::from_secs(1)), JoinOutcome::Joined);

        assert!(!actions.is_empty(), "snapshots produce decisions");
        assert!(
            actions
                .iter()
                .any(|action| matches!(action, Action::MoveLeft | Action::MoveUp | Action::MoveDown)),
            "a player that cannot leave its cell must try another way, got {actions:?}"
        );
    }
}
