use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::Duration,
};

use wizard_maze_core::{
    Action, CellCoord, Direction, GameStateSnapshot, MazeLayout, PixelPoint,
};
use wizard_maze_system_pathfinding::Walkable;

const HISTORY_LENGTH: usize = 10;

/// Failed attempts in one direction before the step is believed to be walled.
const WALL_EVIDENCE: u32 = 12;

/// Knowledge an AI instance accumulates from the snapshots it receives.
///
/// Owned by exactly one decision engine and rebuilt from snapshots only.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    visited: HashSet<CellCoord>,
    sightings: HashMap<CellCoord, Duration>,
    history: VecDeque<CellCoord>,
    attempts: HashMap<(CellCoord, Direction), u32>,
    walls: HashSet<(CellCoord, Direction)>,
    level_name: String,
    pub(crate) cached_path: Vec<CellCoord>,
    pub(crate) current_goal: Option<CellCoord>,
    pub(crate) stuck_counter: u32,
    pub(crate) last_action: Option<Action>,
    pub(crate) last_position: Option<PixelPoint>,
    pub(crate) last_fired: Option<Duration>,
    pub(crate) last_moved_at: Duration,
    pub(crate) shoot_after_turn: bool,
    pub(crate) starting_cell: Option<CellCoord>,
}

impl Memory {
    /// Folds one snapshot into the memory.
    pub(crate) fn record(&mut self, snapshot: &GameStateSnapshot) {
        if snapshot.layout.name() != self.level_name {
            self.level_name = snapshot.layout.name().to_owned();
            self.walls.clear();
            self.attempts.clear();
            self.visited.clear();
            self.forget_route();
        }

        let Some(cell) = CellCoord::containing(snapshot.position) else {
            return;
        };
        let previous = self.history.back().copied();
        let _ = self.visited.insert(cell);
        if previous != Some(cell) {
            self.history.push_back(cell);
            if self.history.len() > HISTORY_LENGTH {
                let _ = self.history.pop_front();
            }
            self.last_moved_at = snapshot.elapsed;
        }

        for enemy in snapshot.enemies.iter().filter(|enemy| enemy.visible) {
            if let Some(seen) = CellCoord::containing(enemy.position) {
                let _ = self.sightings.insert(seen, snapshot.elapsed);
            }
        }

        let pushing = self
            .last_action
            .and_then(Action::direction)
            .filter(|direction| *direction == snapshot.direction);
        if let (Some(direction), Some(previous)) = (pushing, previous) {
            if previous == cell && !snapshot.in_cage {
                let count = self.attempts.entry((cell, direction)).or_insert(0);
                *count += 1;
                if *count == WALL_EVIDENCE && self.walls.insert((cell, direction)) {
                    log::debug!(
                        "{:?}: assuming a wall {direction:?} of ({}, {})",
                        snapshot.slot,
                        cell.column(),
                        cell.row()
                    );
                }
            } else {
                let _ = self.attempts.remove(&(previous, direction));
            }
        }

        if self.starting_cell.is_none() && !snapshot.in_cage {
            self.starting_cell = Some(cell);
        }
    }

    /// Drops everything tied to the previous life of the player.
    pub(crate) fn respawn(&mut self) {
        self.starting_cell = None;
        self.shoot_after_turn = false;
        self.stuck_counter = 0;
        self.forget_route();
    }

    pub(crate) fn forget_route(&mut self) {
        self.cached_path.clear();
        self.current_goal = None;
    }

    /// Whether the cell has been occupied at some point.
    #[must_use]
    pub fn has_visited(&self, cell: CellCoord) -> bool {
        self.visited.contains(&cell)
    }

    /// Number of distinct cells occupied so far.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// When an enemy was last seen in the cell.
    #[must_use]
    pub fn last_sighting(&self, cell: CellCoord) -> Option<Duration> {
        self.sightings.get(&cell).copied()
    }

    /// Whether repeated failed moves suggest the step is blocked.
    #[must_use]
    pub fn believes_wall(&self, cell: CellCoord, direction: Direction) -> bool {
        self.walls.contains(&(cell, direction))
    }

    /// Cells still ahead on the cached route.
    #[must_use]
    pub fn cached_path(&self) -> &[CellCoord] {
        &self.cached_path
    }

    /// Consecutive progress samples taken without moving.
    #[must_use]
    pub const fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }

    /// Most recent decision.
    #[must_use]
    pub const fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    /// First cell occupied outside the cage during the current life.
    #[must_use]
    pub const fn starting_cell(&self) -> Option<CellCoord> {
        self.starting_cell
    }
}

/// Maze as the AI understands it: the layout minus the walls it inferred.
pub(crate) struct KnownMaze<'a> {
    pub(crate) layout: &'a MazeLayout,
    pub(crate) memory: &'a Memory,
}

impl KnownMaze<'_> {
    pub(crate) fn is_open(&self, cell: CellCoord, direction: Direction) -> bool {
        self.layout.is_open(cell, direction) && !self.memory.believes_wall(cell, direction)
    }
}

impl Walkable for KnownMaze<'_> {
    fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool {
        self.layout.is_walkable(from, to)
            && from
                .direction_to(to)
                .is_some_and(|direction| !self.memory.believes_wall(from, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::{Memory, WALL_EVIDENCE};
    use std::{sync::Arc, time::Duration};
    use wizard_maze_core::{
        Action, CellCoord, Direction, GameStateSnapshot, MazeLayout, PixelPoint, PlayerSlot,
    };

    fn snapshot(position: PixelPoint, direction: Direction, elapsed_ms: u64) -> GameStateSnapshot {
        GameStateSnapshot {
            slot: PlayerSlot::One,
            elapsed: Duration::from_millis(elapsed_ms),
            position,
            direction,
            in_cage: false,
            has_bullet: false,
            cooperative: false,
            enemies: Vec::new(),
            bullets: Vec::new(),
            teammate: None,
            layout: Arc::new(MazeLayout::open("open", 13, 8)),
        }
    }

    #[test]
    fn pushing_against_a_blocked_step_eventually_marks_a_wall() {
        let mut memory = Memory::default();
        let here = PixelPoint::new(24.0, 20.0);
        memory.last_action = Some(Action::MoveRight);
        for tick in 0..=u64::from(WALL_EVIDENCE) {
            memory.record(&snapshot(here, Direction::East, tick * 16));
        }
        assert!(memory.believes_wall(CellCoord::new(2, 2), Direction::East));
        assert!(!memory.believes_wall(CellCoord::new(2, 2), Direction::West));
    }

    #[test]
    fn turning_in_place_is_not_evidence_of_a_wall() {
        let mut memory = Memory::default();
        memory.last_action = Some(Action::MoveRight);
        for tick in 0..40 {
            memory.record(&snapshot(PixelPoint::new(24.0, 20.0), Direction::North, tick));
        }
        assert!(!memory.believes_wall(CellCoord::new(2, 2), Direction::East));
        assert_eq!(memory.visited_count(), 1);
        assert_eq!(memory.starting_cell(), Some(CellCoord::new(2, 2)));
    }
}
