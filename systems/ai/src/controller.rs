use std::time::Duration;

use wizard_maze_core::{Action, Buttons, GameStateSnapshot, JoinOutcome, PlayerSlot, SpawnError};

use crate::{AiVariant, AiWorker, DecisionEngine};

#[derive(Debug)]
enum Pilot {
    Threaded(AiWorker),
    Inline(Box<DecisionEngine>),
}

/// Owns the AI of both player slots and converts its decisions into button
/// presses.
///
/// A slot whose worker cannot start, or dies later, keeps playing with an
/// engine driven on the caller's thread.
#[derive(Debug)]
pub struct AiController {
    pilots: [Option<Pilot>; 2],
    pressed: [Buttons; 2],
    seed: u64,
}

impl AiController {
    /// Creates a controller with no active AI. Engines derive their random
    /// streams from `seed` and the slot.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            pilots: [None, None],
            pressed: [Buttons::default(); 2],
            seed,
        }
    }

    /// Puts the slot under AI control, replacing any running AI.
    ///
    /// Returns the spawn failure when the slot had to fall back to inline
    /// decisions.
    pub fn start(&mut self, slot: PlayerSlot, variant: AiVariant) -> Result<(), SpawnError> {
        let _ = self.stop(slot, Duration::from_secs(1));
        let seed = self.seed_for(slot);
        let (pilot, outcome) = match AiWorker::spawn(slot, variant, seed) {
            Ok(worker) => (Pilot::Threaded(worker), Ok(())),
            Err(error) => {
                log::error!("{error}; {slot:?} AI decides on the simulation thread");
                let engine = DecisionEngine::new(slot, variant, seed);
                (Pilot::Inline(Box::new(engine)), Err(error))
            }
        };
        self.pilots[slot.index()] = Some(pilot);
        outcome
    }

    /// Returns the slot to human control.
    pub fn stop(&mut self, slot: PlayerSlot, timeout: Duration) -> JoinOutcome {
        self.pressed[slot.index()] = Buttons::default();
        match self.pilots[slot.index()].take() {
            Some(Pilot::Threaded(mut worker)) => worker.stop(timeout),
            Some(Pilot::Inline(_)) | None => JoinOutcome::Joined,
        }
    }

    /// Stops every AI.
    pub fn stop_all(&mut self, timeout: Duration) {
        for slot in PlayerSlot::ALL {
            let _ = self.stop(slot, timeout);
        }
    }

    /// Whether the slot is controlled by an AI.
    #[must_use]
    pub fn is_active(&self, slot: PlayerSlot) -> bool {
        self.pilots[slot.index()].is_some()
    }

    /// Number of AI decision threads that are running.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.pilots
            .iter()
            .flatten()
            .filter(|pilot| matches!(pilot, Pilot::Threaded(worker) if worker.is_alive()))
            .count()
    }

    /// Sends the slot's AI the state of the current frame.
    pub fn push(&mut self, snapshot: GameStateSnapshot) {
        let slot = snapshot.slot;
        let seed = self.seed_for(slot);
        let Some(pilot) = self.pilots[slot.index()].as_mut() else {
            return;
        };
        match pilot {
            Pilot::Threaded(worker) if worker.is_alive() => {
                if !worker.push(snapshot) {
                    log::debug!("{slot:?} AI inbox closed; snapshot dropped");
                }
            }
            Pilot::Threaded(worker) => {
                log::error!("{slot:?} AI worker is gone; deciding on the simulation thread");
                let mut engine = DecisionEngine::new(slot, worker.variant(), seed);
                engine.observe(snapshot);
                self.pressed[slot.index()].press(engine.decide());
                *pilot = Pilot::Inline(Box::new(engine));
            }
            Pilot::Inline(engine) => {
                engine.observe(snapshot);
                self.pressed[slot.index()].press(engine.decide());
            }
        }
    }

    /// Buttons the slot's AI presses this frame.
    ///
    /// Decisions received since the previous call are merged into one press;
    /// a frame without decisions releases everything.
    pub fn buttons(&mut self, slot: PlayerSlot) -> Buttons {
        let buttons = std::mem::take(&mut self.pressed[slot.index()]);
        match &self.pilots[slot.index()] {
            Some(Pilot::Threaded(worker)) => merge_decisions(buttons, worker.drain()),
            _ => buttons,
        }
    }

    fn seed_for(&self, slot: PlayerSlot) -> u64 {
        self.seed.wrapping_add(slot.index() as u64)
    }
}

/// Holds the latest movement decision only, plus fire when any decision shot.
fn merge_decisions(mut buttons: Buttons, actions: Vec<Action>) -> Buttons {
    if actions.contains(&Action::Shoot) {
        buttons.press(Action::Shoot);
    }
    if let Some(latest) = actions.into_iter().rev().find(|action| action.is_move()) {
        buttons.press(latest);
    }
    buttons
}

impl Drop for AiController {
    fn drop(&mut self) {
        self.stop_all(Duration::from_millis(200));
    }
}
