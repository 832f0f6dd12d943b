#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid search used by AI-controlled players.
//!
//! Both searches expand neighbours in the order up, right, down, left and
//! break priority ties by insertion order, so identical queries always yield
//! identical paths.

use std::{
    cmp::Reverse,
    collections::{hash_map::Entry, BinaryHeap, HashMap},
};

use wizard_maze_core::{CellCoord, Direction, MazeLayout};

/// Adjacency contract consumed by the searches.
pub trait Walkable {
    /// Reports whether a single step from `from` to the adjacent `to` is allowed.
    fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool;
}

impl Walkable for MazeLayout {
    fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool {
        MazeLayout::is_walkable(self, from, to)
    }
}

impl<T: Walkable + ?Sized> Walkable for &T {
    fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool {
        (**self).is_walkable(from, to)
    }
}

/// Search strategy used to plan a path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Greedy best-first search ordered by the heuristic alone.
    Greedy,
    /// A* search ordered by steps taken plus the Manhattan heuristic.
    #[default]
    AStar,
}

/// Plans a path with the selected algorithm.
///
/// The returned cells exclude `start` and end with `goal`; an empty vector
/// means the goal is unreachable or equal to the start.
#[must_use]
pub fn find_path<W: Walkable>(
    algorithm: Algorithm,
    grid: &W,
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    match algorithm {
        Algorithm::Greedy => find_path_greedy(grid, start, goal),
        Algorithm::AStar => find_path_astar(grid, start, goal),
    }
}

/// Optimal unit-cost search.
#[must_use]
pub fn find_path_astar<W: Walkable>(grid: &W, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let mut frontier = Frontier::default();
    let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
    let mut cost_so_far: HashMap<CellCoord, u32> = HashMap::new();
    let _ = cost_so_far.insert(start, 0);
    frontier.push(start.manhattan_distance(goal), 0, start);

    while let Some((cost, current)) = frontier.pop() {
        if current == goal {
            break;
        }
        if cost_so_far.get(&current).is_some_and(|best| cost > *best) {
            continue;
        }

        for next in neighbours(grid, current) {
            let next_cost = cost + 1;
            let improved = match cost_so_far.entry(next) {
                Entry::Vacant(slot) => {
                    let _ = slot.insert(next_cost);
                    true
                }
                Entry::Occupied(mut slot) if next_cost < *slot.get() => {
                    let _ = slot.insert(next_cost);
                    true
                }
                Entry::Occupied(_) => false,
            };
            if improved {
                let _ = came_from.insert(next, current);
                frontier.push(next_cost + next.manhattan_distance(goal), next_cost, next);
            }
        }
    }

    reconstruct(&came_from, start, goal)
}

/// Fast, possibly suboptimal search.
#[must_use]
pub fn find_path_greedy<W: Walkable>(
    grid: &W,
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    let mut frontier = Frontier::default();
    let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
    frontier.push(start.manhattan_distance(goal), 0, start);

    while let Some((_, current)) = frontier.pop() {
        if current == goal {
            break;
        }
        for next in neighbours(grid, current) {
            if next == start || came_from.contains_key(&next) {
                continue;
            }
            let _ = came_from.insert(next, current);
            frontier.push(next.manhattan_distance(goal), 0, next);
        }
    }

    reconstruct(&came_from, start, goal)
}

fn neighbours<'a, W: Walkable>(
    grid: &'a W,
    cell: CellCoord,
) -> impl Iterator<Item = CellCoord> + 'a {
    Direction::ALL
        .into_iter()
        .filter_map(move |direction| cell.neighbor(direction))
        .filter(move |next| grid.is_walkable(cell, *next))
}

fn reconstruct(
    came_from: &HashMap<CellCoord, CellCoord>,
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        let Some(previous) = came_from.get(&current) else {
            log::trace!(
                "no path from ({}, {}) to ({}, {})",
                start.column(),
                start.row(),
                goal.column(),
                goal.row()
            );
            return Vec::new();
        };
        path.push(current);
        current = *previous;
    }
    path.reverse();
    path
}

/// Min-priority queue whose ties pop in insertion order.
#[derive(Debug, Default)]
struct Frontier {
    heap: BinaryHeap<Reverse<(u32, u64, u32, CellCoord)>>,
    sequence: u64,
}

impl Frontier {
    fn push(&mut self, priority: u32, cost: u32, cell: CellCoord) {
        self.heap.push(Reverse((priority, self.sequence, cost, cell)));
        self.sequence += 1;
    }

    fn pop(&mut self) -> Option<(u32, CellCoord)> {
        self.heap
            .pop()
            .map(|Reverse((_, _, cost, cell))| (cost, cell))
    }
}

#[cfg(test)]
mod tests {
    use super::{find_path_astar, find_path_greedy, Walkable};
    use wizard_maze_core::CellCoord;

    struct OpenField {
        width: u32,
        height: u32,
    }

    impl Walkable for OpenField {
        fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool {
            from.manhattan_distance(to) == 1 && to.column() < self.width && to.row() < self.height
        }
    }

    #[test]
    fn equal_cost_ties_follow_insertion_order() {
        let field = OpenField {
            width: 3,
            height: 3,
        };
        let path = find_path_astar(&field, CellCoord::new(0, 2), CellCoord::new(1, 1));
        assert_eq!(path, vec![CellCoord::new(0, 1), CellCoord::new(1, 1)]);
    }

    #[test]
    fn start_equal_to_goal_yields_an_empty_path() {
        let field = OpenField {
            width: 2,
            height: 2,
        };
        let cell = CellCoord::new(1, 1);
        assert!(find_path_astar(&field, cell, cell).is_empty());
        assert!(find_path_greedy(&field, cell, cell).is_empty());
    }

    #[test]
    fn goal_outside_the_field_is_unreachable() {
        let field = OpenField {
            width: 2,
            height: 2,
        };
        let path = find_path_greedy(&field, CellCoord::new(0, 0), CellCoord::new(5, 5));
        assert!(path.is_empty());
    }
}
