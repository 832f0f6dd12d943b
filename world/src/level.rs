use std::sync::Arc;

use rand::Rng;
use wizard_maze_core::{
    CellCoord, Direction, MazeLayout, PixelPoint, PlayerSlot, TunnelSide, CELL_HEIGHT, CELL_WIDTH,
};

/// Seconds between two tunnel toggles.
pub const TUNNEL_PERIOD: f32 = 2.0;

/// Seconds between two difficulty threshold increases.
pub const THRESHOLD_PERIOD: f32 = 10.0;

/// Highest difficulty threshold.
pub const MAX_THRESHOLD: usize = 4;

/// Row holding both tunnels.
pub const TUNNEL_ROW: u32 = 3;

const RANDOM_POSITION_ATTEMPTS: usize = 10;
const WIZARD_POSITION_ATTEMPTS: usize = 50;
const WIZARD_FALLBACK_CELL: CellCoord = CellCoord::new(6, 3);

/// Movement permitted from a position, as reported by [`GridLevel::can_move`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// Moving up is allowed.
    pub up: bool,
    /// Moving down is allowed.
    pub down: bool,
    /// Moving left is allowed.
    pub left: bool,
    /// Moving right is allowed.
    pub right: bool,
    /// Open tunnel the position gives access to.
    pub tunnel: Option<TunnelSide>,
}

impl MoveOptions {
    /// Reports whether movement in the direction is allowed.
    #[must_use]
    pub const fn allows(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.up,
            Direction::East => self.right,
            Direction::South => self.down,
            Direction::West => self.left,
        }
    }

    /// Reports whether the open tunnel lies in the provided direction.
    #[must_use]
    pub fn tunnel_towards(&self, direction: Direction) -> bool {
        self.tunnel
            .is_some_and(|tunnel| tunnel.exit_direction() == direction)
    }
}

/// Direction-change bookkeeping carried by roaming enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Steering {
    /// Whether the next grid cell may trigger a new direction pick.
    pub can_change_direction: bool,
    /// Horizontal direction the enemy is drawn towards, if any.
    pub preferred: Option<Direction>,
}

impl Steering {
    /// Steering for an enemy without a preferred side.
    #[must_use]
    pub const fn free() -> Self {
        Self {
            can_change_direction: true,
            preferred: None,
        }
    }

    /// Steering for an enemy drawn towards the provided horizontal direction.
    #[must_use]
    pub const fn drawn_towards(preferred: Direction) -> Self {
        Self {
            can_change_direction: true,
            preferred: Some(preferred),
        }
    }
}

/// Active maze plus its tunnel and difficulty clocks.
#[derive(Clone, Debug)]
pub struct GridLevel {
    layout: Arc<MazeLayout>,
    tunnels_open: bool,
    tunnel_timer: f32,
    threshold: usize,
    threshold_timer: f32,
}

impl GridLevel {
    /// Creates a level over the provided layout with open tunnels.
    #[must_use]
    pub fn new(layout: Arc<MazeLayout>) -> Self {
        Self {
            layout,
            tunnels_open: true,
            tunnel_timer: 0.0,
            threshold: 0,
            threshold_timer: 0.0,
        }
    }

    /// Shared maze topology.
    #[must_use]
    pub fn layout(&self) -> &Arc<MazeLayout> {
        &self.layout
    }

    /// Whether the tunnels currently let enemies through.
    #[must_use]
    pub const fn tunnels_open(&self) -> bool {
        self.tunnels_open
    }

    /// Current difficulty threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Restarts the clocks for the provided zero-based stage.
    pub fn reset(&mut self, stage: u32) {
        self.threshold = usize::try_from(stage / 2)
            .unwrap_or(MAX_THRESHOLD)
            .min(MAX_THRESHOLD);
        self.threshold_timer = 0.0;
        self.tunnel_timer = 0.0;
        self.tunnels_open = true;
    }

    /// Advances the threshold and tunnel clocks.
    pub fn update(&mut self, dt: f32) {
        if self.threshold < MAX_THRESHOLD {
            self.threshold_timer += dt;
            if self.threshold_timer >= THRESHOLD_PERIOD {
                self.threshold = (self.threshold + 1).min(MAX_THRESHOLD);
                self.threshold_timer -= THRESHOLD_PERIOD;
            }
        }

        self.tunnel_timer += dt;
        if self.tunnel_timer >= TUNNEL_PERIOD {
            self.tunnels_open = !self.tunnels_open;
            self.tunnel_timer -= TUNNEL_PERIOD;
        }
    }

    /// Cell occupied by a tunnel.
    #[must_use]
    pub fn tunnel_cell(&self, side: TunnelSide) -> CellCoord {
        match side {
            TunnelSide::Left => CellCoord::new(1, TUNNEL_ROW),
            TunnelSide::Right => CellCoord::new(self.layout.width().saturating_sub(2), TUNNEL_ROW),
        }
    }

    /// Pixel position of a tunnel cell.
    #[must_use]
    pub fn tunnel_position(&self, side: TunnelSide) -> PixelPoint {
        self.tunnel_cell(side).top_left()
    }

    /// Pixel position of a cell.
    #[must_use]
    pub fn cell_position(&self, cell: CellCoord) -> PixelPoint {
        self.layout.cell_position(cell)
    }

    /// Reports whether the floored position sits exactly on a cell corner.
    #[must_use]
    pub fn is_on_grid_cell(&self, point: PixelPoint) -> bool {
        point.pixel_x().rem_euclid(CELL_WIDTH) == 0 && point.pixel_y().rem_euclid(CELL_HEIGHT) == 0
    }

    /// Movement allowed from a position.
    ///
    /// Off-grid positions may only continue along the axis they are offset on.
    #[must_use]
    pub fn can_move(&self, point: PixelPoint) -> MoveOptions {
        let x = point.pixel_x();
        let y = point.pixel_y();

        if x.rem_euclid(CELL_WIDTH) != 0 {
            return MoveOptions {
                left: true,
                right: true,
                ..MoveOptions::default()
            };
        }
        if y.rem_euclid(CELL_HEIGHT) != 0 {
            return MoveOptions {
                up: true,
                down: true,
                ..MoveOptions::default()
            };
        }

        let Some(cell) = CellCoord::containing(point) else {
            return MoveOptions::default();
        };
        let mut options = MoveOptions {
            up: self.layout.is_open(cell, Direction::North),
            down: self.layout.is_open(cell, Direction::South),
            left: self.layout.is_open(cell, Direction::West),
            right: self.layout.is_open(cell, Direction::East),
            tunnel: None,
        };

        if self.tunnels_open {
            if cell == self.tunnel_cell(TunnelSide::Left) {
                options.tunnel = Some(TunnelSide::Left);
            } else if cell == self.tunnel_cell(TunnelSide::Right) {
                options.tunnel = Some(TunnelSide::Right);
            }
        }
        options
    }

    /// Horizontal half of the maze the position lies in, as a direction pointing to the centre.
    #[must_use]
    pub fn side_of(&self, point: PixelPoint) -> Direction {
        let half = self.layout.pixel_width() as f32 / 2.0;
        if half - point.pixel_x() as f32 >= 0.0 {
            Direction::East
        } else {
            Direction::West
        }
    }

    /// Picks the direction an enemy takes from its current position.
    ///
    /// Returns the chosen direction together with the open tunnel reported at
    /// the position, if any. A new direction is only picked once per grid
    /// cell; `steering.can_change_direction` is re-armed off-grid.
    pub fn pick_direction<R: Rng>(
        &self,
        position: PixelPoint,
        current: Direction,
        steering: &mut Steering,
        rng: &mut R,
    ) -> (Direction, Option<TunnelSide>) {
        if !self.is_on_grid_cell(position) {
            steering.can_change_direction = true;
            return (current, None);
        }
        if !steering.can_change_direction {
            return (current, None);
        }

        let wrong_side = steering
            .preferred
            .is_some_and(|preferred| preferred == self.side_of(position));
        let options = self.can_move(position);
        let tunnel = options.tunnel;

        if steering.preferred.is_some() {
            if let Some(side) = tunnel {
                steering.can_change_direction = false;
                return (side.exit_direction(), tunnel);
            }
        }

        let mut possible: Vec<Direction> = Vec::with_capacity(4);
        if current.is_horizontal() {
            if options.allows(current) || options.tunnel_towards(current) {
                if wrong_side {
                    if steering.preferred == Some(current) {
                        steering.can_change_direction = false;
                        return (current, tunnel);
                    }
                    if !options.down && !options.up {
                        possible.push(current);
                    }
                } else {
                    possible.push(current);
                }
            }
            if options.up {
                possible.push(Direction::North);
            }
            if options.down {
                possible.push(Direction::South);
            }
        } else {
            if options.allows(current) {
                possible.push(current);
            }
            for horizontal in [Direction::East, Direction::West] {
                if options.allows(horizontal) || options.tunnel_towards(horizontal) {
                    if wrong_side && steering.preferred == Some(horizontal) {
                        steering.can_change_direction = false;
                        return (horizontal, tunnel);
                    }
                    possible.push(horizontal);
                }
            }
        }
        if possible.is_empty() {
            possible.push(current.opposite());
        }

        if possible.len() > 1 && wrong_side {
            if let Some(backwards) = steering.preferred.map(Direction::opposite) {
                if let Some(index) = possible.iter().position(|d| *d == backwards) {
                    let _ = possible.remove(index);
                }
            }
        }

        let chosen = possible[rng.gen_range(0..possible.len())];
        steering.can_change_direction = false;
        (chosen, tunnel)
    }

    /// Random spawn position, optionally keeping clear of the cage exits.
    pub fn random_position<R: Rng>(&self, rng: &mut R, avoid_exits: bool) -> PixelPoint {
        let max_column = self.layout.width().saturating_sub(2).max(1);
        let max_row = self.layout.height().saturating_sub(2).max(1);
        let roll = |rng: &mut R| {
            CellCoord::new(rng.gen_range(1..=max_column), rng.gen_range(1..=max_row))
        };

        for _ in 0..RANDOM_POSITION_ATTEMPTS {
            let cell = roll(rng);
            if avoid_exits && near_cage_exit(cell) {
                continue;
            }
            return self.cell_position(cell);
        }
        let cell = roll(rng);
        self.cell_position(cell)
    }

    /// Reports whether the Wizard may occupy the position.
    #[must_use]
    pub fn is_wizard_position(&self, point: PixelPoint) -> bool {
        let Some(cell) = CellCoord::containing(point) else {
            return false;
        };
        let width = self.layout.width();
        let height = self.layout.height();
        if cell.column() < 1 || cell.column() + 1 >= width {
            return false;
        }
        if cell.row() < 1 || cell.row() + 1 >= height {
            return false;
        }
        !PlayerSlot::ALL.into_iter().any(|slot| {
            let cage = slot.cage();
            cell.column() == cage.column()
                && (cell.row() == cage.row() || cell.row() + 1 == cage.row())
        })
    }

    /// Random teleport destination for the Wizard.
    pub fn wizard_teleport_position<R: Rng>(&self, rng: &mut R) -> PixelPoint {
        let column_span = self.layout.width().saturating_sub(5);
        let row_span = self.layout.height().saturating_sub(5);
        for _ in 0..WIZARD_POSITION_ATTEMPTS {
            let cell = CellCoord::new(
                2 + rng.gen_range(0..=column_span),
                2 + rng.gen_range(0..=row_span),
            );
            if in_cage_area(cell) {
                continue;
            }
            let position = self.cell_position(cell);
            if self.is_wizard_position(position) {
                return position;
            }
        }
        self.cell_position(WIZARD_FALLBACK_CELL)
    }

    /// Random direction in which a full cell step keeps the Wizard valid.
    pub fn wizard_direction<R: Rng>(
        &self,
        position: PixelPoint,
        current: Direction,
        rng: &mut R,
    ) -> Direction {
        let valid: Vec<Direction> = [
            Direction::East,
            Direction::West,
            Direction::South,
            Direction::North,
        ]
        .into_iter()
        .filter(|direction| {
            let target = PixelPoint::new(
                position.pixel_x() as f32 + (direction.dx() * CELL_WIDTH) as f32,
                position.pixel_y() as f32 + (direction.dy() * CELL_HEIGHT) as f32,
            );
            self.is_wizard_position(target)
        })
        .collect();

        if valid.is_empty() {
            current
        } else {
            valid[rng.gen_range(0..valid.len())]
        }
    }
}

fn near_cage_exit(cell: CellCoord) -> bool {
    PlayerSlot::ALL.into_iter().any(|slot| {
        let cage = slot.cage();
        let exit_row = cage.row().saturating_sub(1);
        cell.column().abs_diff(cage.column()) <= 1 && cell.row().abs_diff(exit_row) <= 1
    })
}

fn in_cage_area(cell: CellCoord) -> bool {
    PlayerSlot::ALL.into_iter().any(|slot| {
        let cage = slot.cage();
        let inward = match slot {
            PlayerSlot::One => cage.column().saturating_sub(1),
            PlayerSlot::Two => cage.column() + 1,
        };
        (cell.column() == cage.column()
            && (cell.row() == cage.row() || cell.row() + 1 == cage.row()))
            || (cell.column() == inward && cell.row() == cage.row())
    })
}

#[cfg(test)]
mod tests {
    use super::{GridLevel, Steering, TUNNEL_PERIOD};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;
    use wizard_maze_core::{CellCoord, Direction, MazeLayout, PixelPoint, TunnelSide};

    fn sample_level() -> GridLevel {
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
        let layout = MazeLayout::from_rows("sample", &rows).expect("layout builds");
        GridLevel::new(Arc::new(layout))
    }

    #[test]
    fn right_walls_block_from_both_sides() {
        let level = sample_level();
        let layout = Arc::clone(level.layout());
        for row in 1..layout.height() {
            for column in 1..layout.width() - 1 {
                let cell = CellCoord::new(column, row);
                let mask = layout.mask(cell).expect("cell exists");
                if !mask.blocks_right() {
                    continue;
                }
                let here = level.can_move(cell.top_left());
                let next = level.can_move(CellCoord::new(column + 1, row).top_left());
                assert!(!here.right, "right wall at {cell:?} must block moving right");
                assert!(!next.left, "right wall at {cell:?} must block moving left");
            }
        }
    }

    #[test]
    fn off_grid_positions_keep_their_axis() {
        let level = sample_level();
        let horizontal = level.can_move(PixelPoint::new(26.4, 20.0));
        assert!(horizontal.left && horizontal.right);
        assert!(!horizontal.up && !horizontal.down);

        let vertical = level.can_move(PixelPoint::new(24.0, 23.0));
        assert!(vertical.up && vertical.down);
        assert!(!vertical.left && !vertical.right);
    }

    #[test]
    fn boundary_cells_are_fully_blocked() {
        let level = sample_level();
        let options = level.can_move(CellCoord::new(0, 3).top_left());
        assert!(!options.up && !options.down && !options.left && !options.right);
    }

    #[test]
    fn tunnels_toggle_once_per_period() {
        let mut level = sample_level();
        assert!(level.tunnels_open());
        level.update(TUNNEL_PERIOD);
        assert!(!level.tunnels_open(), "tunnels close after one period");
        level.update(TUNNEL_PERIOD);
        assert!(level.tunnels_open(), "tunnels reopen after two periods");
    }

    #[test]
    fn tunnel_is_reported_only_while_open() {
        let mut level = sample_level();
        let left = level.tunnel_position(TunnelSide::Left);
        assert_eq!(level.can_move(left).tunnel, Some(TunnelSide::Left));
        level.update(TUNNEL_PERIOD);
        assert_eq!(level.can_move(left).tunnel, None);
        assert_eq!(level.tunnel_cell(TunnelSide::Right), CellCoord::new(11, 3));
    }

    #[test]
    fn threshold_starts_from_stage_and_caps() {
        let mut level = sample_level();
        level.reset(5);
        assert_eq!(level.threshold(), 2);
        for _ in 0..10 {
            level.update(10.0);
        }
        assert_eq!(level.threshold(), 4);
    }

    #[test]
    fn preferred_enemies_head_into_open_tunnels() {
        let level = sample_level();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut steering = Steering::drawn_towards(Direction::West);
        let position = level.tunnel_position(TunnelSide::Left);
        let (direction, tunnel) =
            level.pick_direction(position, Direction::North, &mut steering, &mut rng);
        assert_eq!(direction, Direction::West);
        assert_eq!(tunnel, Some(TunnelSide::Left));
        assert!(!steering.can_change_direction);
    }

    #[test]
    fn direction_is_picked_once_per_cell() {
        let level = sample_level();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut steering = Steering::free();
        let position = CellCoord::new(3, 3).top_left();
        let (first, _) = level.pick_direction(position, Direction::East, &mut steering, &mut rng);
        assert!(level.can_move(position).allows(first) || first == Direction::West);
        let (second, _) = level.pick_direction(position, first, &mut steering, &mut rng);
        assert_eq!(second, first, "no re-pick while still on the same cell");

        let moved = position.offset(first.dx() as f32, first.dy() as f32);
        let _ = level.pick_direction(moved, first, &mut steering, &mut rng);
        assert!(steering.can_change_direction, "leaving the cell re-arms picking");
    }

    #[test]
    fn random_positions_stay_inside_the_maze() {
        let level = sample_level();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..200 {
            let position = level.random_position(&mut rng, true);
            let cell = CellCoord::containing(position).expect("non-negative position");
            assert!(level.layout().is_interior(cell));
        }
    }

    #[test]
    fn wizard_teleports_stay_valid() {
        let level = sample_level();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let position = level.wizard_teleport_position(&mut rng);
            assert!(level.is_wizard_position(position));
        }
        assert!(!level.is_wizard_position(CellCoord::new(11, 6).top_left()));
        assert!(!level.is_wizard_position(CellCoord::new(0, 3).top_left()));
    }
}
