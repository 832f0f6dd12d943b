use wizard_maze_core::{CellCoord, MazeLayout};
use wizard_maze_system_pathfinding::{find_path, Algorithm, Walkable};

fn level_one() -> MazeLayout {
    let rows: Vec<Vec<u8>> = [
        "3222222222222",
        "1002000002010",
        "1020100010210",
        "1000020200010",
        "1021000012010",
        "1000002000010",
        "1222222222230",
        "0000000000000",
    ]
    .iter()
    .map(|row| row.bytes().map(|byte| byte - b'0').collect())
    .collect();
    MazeLayout::from_rows("Level1", &rows).expect("level one builds")
}

fn interior(layout: &MazeLayout) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for row in 1..layout.height() - 1 {
        for column in 1..layout.width() - 1 {
            cells.push(CellCoord::new(column, row));
        }
    }
    cells
}

#[test]
fn consecutive_path_cells_are_walkable() {
    let layout = level_one();
    let cells = interior(&layout);
    for algorithm in [Algorithm::Greedy, Algorithm::AStar] {
        for &start in &cells {
            for &goal in cells.iter().step_by(5) {
                let path = find_path(algorithm, &layout, start, goal);
                if path.is_empty() {
                    continue;
                }
                assert_eq!(path.last(), Some(&goal), "{algorithm:?} path must end at the goal");
                let mut previous = start;
                for &cell in &path {
                    assert!(
                        layout.is_walkable(previous, cell),
                        "{algorithm:?} stepped through a wall from {previous:?} to {cell:?}"
                    );
                    previous = cell;
                }
            }
        }
    }
}

#[test]
fn astar_is_never_longer_than_greedy() {
    let layout = level_one();
    let start = CellCoord::new(11, 6);
    for goal in interior(&layout) {
        let optimal = find_path(Algorithm::AStar, &layout, start, goal);
        let greedy = find_path(Algorithm::Greedy, &layout, start, goal);
        assert_eq!(
            optimal.is_empty(),
            greedy.is_empty(),
            "both searches must agree on reachability of {goal:?}"
        );
        assert!(
            optimal.len() <= greedy.len(),
            "A* found {} steps to {goal:?} but greedy found {}",
            optimal.len(),
            greedy.len()
        );
    }
}

#[test]
fn walls_force_a_detour() {
    let layout = level_one();
    let start = CellCoord::new(4, 2);
    let goal = CellCoord::new(5, 2);
    assert!(!Walkable::is_walkable(&layout, start, goal));
    let path = find_path(Algorithm::AStar, &layout, start, goal);
    assert_eq!(
        path,
        vec![CellCoord::new(4, 1), CellCoord::new(5, 1), goal],
        "the right wall of (4, 2) must be walked around through the row above"
    );
}
