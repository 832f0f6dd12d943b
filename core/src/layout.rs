use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Direction, PixelPoint};

/// Width of a maze cell in pixels.
pub const CELL_WIDTH: i32 = 12;

/// Height of a maze cell in pixels.
pub const CELL_HEIGHT: i32 = 10;

/// Horizontal pivot of character and bullet sprites.
pub const SPRITE_PIVOT_X: f32 = 4.0;

/// Vertical pivot of character and bullet sprites.
pub const SPRITE_PIVOT_Y: f32 = 4.0;

/// Wall bits stored for a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallMask(u8);

impl WallMask {
    /// Mask without any wall.
    pub const OPEN: WallMask = WallMask(0);

    /// Bit marking a wall on the right edge of the cell.
    pub const BLOCKED_RIGHT: u8 = 1;

    /// Bit marking a wall on the bottom edge of the cell.
    pub const BLOCKED_DOWN: u8 = 2;

    /// Creates a mask from raw bits; bits other than the two wall bits are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::BLOCKED_RIGHT | Self::BLOCKED_DOWN))
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Reports whether the right edge is walled.
    #[must_use]
    pub const fn blocks_right(&self) -> bool {
        self.0 & Self::BLOCKED_RIGHT != 0
    }

    /// Reports whether the bottom edge is walled.
    #[must_use]
    pub const fn blocks_down(&self) -> bool {
        self.0 & Self::BLOCKED_DOWN != 0
    }
}

/// Errors raised while constructing a maze layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout has no rows or no columns.
    #[error("maze layout `{name}` is empty")]
    Empty {
        /// Name of the rejected layout.
        name: String,
    },
    /// The cell buffer does not match the declared dimensions.
    #[error("maze layout `{name}` expects {expected} cells but received {actual}")]
    CellCountMismatch {
        /// Name of the rejected layout.
        name: String,
        /// Number of cells implied by width and height.
        expected: usize,
        /// Number of cells supplied.
        actual: usize,
    },
}

/// Immutable maze topology shared by the world and every worker snapshot.
///
/// Walls belong to the cell on their near side: a right wall stored on
/// `(x, y)` separates `(x, y)` from `(x + 1, y)`, a bottom wall separates
/// `(x, y)` from `(x, y + 1)`. The outermost ring of cells is never walkable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    name: String,
    width: u32,
    height: u32,
    cells: Vec<WallMask>,
}

impl MazeLayout {
    /// Width of the fallback layout.
    pub const FALLBACK_WIDTH: u32 = 13;

    /// Height of the fallback layout.
    pub const FALLBACK_HEIGHT: u32 = 8;

    /// Creates a layout from a row-major buffer of wall masks.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        cells: Vec<WallMask>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(LayoutError::Empty { name });
        }

        let expected = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        if cells.len() != expected {
            return Err(LayoutError::CellCountMismatch {
                name,
                expected,
                actual: cells.len(),
            });
        }

        Ok(Self {
            name,
            width,
            height,
            cells,
        })
    }

    /// Creates a layout from ragged rows of raw wall bits.
    ///
    /// The widest row defines the width; shorter rows are padded with open cells.
    pub fn from_rows(name: impl Into<String>, rows: &[Vec<u8>]) -> Result<Self, LayoutError> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut cells = Vec::with_capacity(width * rows.len());
        for row in rows {
            cells.extend(row.iter().copied().map(WallMask::from_bits));
            cells.extend(std::iter::repeat(WallMask::OPEN).take(width - row.len()));
        }

        let name = name.into();
        let width = u32::try_from(width).map_err(|_| LayoutError::Empty { name: name.clone() })?;
        let height =
            u32::try_from(rows.len()).map_err(|_| LayoutError::Empty { name: name.clone() })?;
        Self::new(name, width, height, cells)
    }

    /// Layout of the given size without any interior wall.
    ///
    /// Dimensions of zero are raised to one.
    #[must_use]
    pub fn open(name: impl Into<String>, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            name: name.into(),
            width,
            height,
            cells: vec![WallMask::OPEN; count],
        }
    }

    /// Safe default substituted when a level cannot be loaded.
    #[must_use]
    pub fn fallback() -> Self {
        Self::open("fallback", Self::FALLBACK_WIDTH, Self::FALLBACK_HEIGHT)
    }

    /// Name of the layout, usually derived from the level file stem.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width of the maze in pixels.
    #[must_use]
    pub fn pixel_width(&self) -> i32 {
        i32::try_from(self.width).unwrap_or(i32::MAX / CELL_WIDTH) * CELL_WIDTH
    }

    /// Height of the maze in pixels.
    #[must_use]
    pub fn pixel_height(&self) -> i32 {
        i32::try_from(self.height).unwrap_or(i32::MAX / CELL_HEIGHT) * CELL_HEIGHT
    }

    /// Wall mask stored for the provided cell, if it lies inside the layout.
    #[must_use]
    pub fn mask(&self, cell: CellCoord) -> Option<WallMask> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let index = usize::try_from(cell.row())
            .ok()?
            .checked_mul(usize::try_from(self.width).ok()?)?
            .checked_add(usize::try_from(cell.column()).ok()?)?;
        self.cells.get(index).copied()
    }

    /// Reports whether the cell lies within the walkable interior, every
    /// cell except those of the first row and column.
    #[must_use]
    pub fn is_interior(&self, cell: CellCoord) -> bool {
        (1..self.width).contains(&cell.column()) && (1..self.height).contains(&cell.row())
    }

    /// Reports whether leaving `cell` in `direction` is unobstructed.
    ///
    /// Cells outside the interior are blocked in every direction. The right
    /// and bottom edges of the layout are implicit walls.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord, direction: Direction) -> bool {
        if !self.is_interior(cell) {
            return false;
        }
        let own = self.mask(cell).unwrap_or_default();
        match direction {
            Direction::East => cell.column() != self.width - 1 && !own.blocks_right(),
            Direction::South => cell.row() != self.height - 1 && !own.blocks_down(),
            Direction::West => cell
                .neighbor(Direction::West)
                .filter(|left| self.is_interior(*left))
                .and_then(|left| self.mask(left))
                .is_some_and(|left| !left.blocks_right()),
            Direction::North => cell
                .neighbor(Direction::North)
                .filter(|above| self.is_interior(*above))
                .and_then(|above| self.mask(above))
                .is_some_and(|above| !above.blocks_down()),
        }
    }

    /// Directions that can be taken from the cell, in search order.
    #[must_use]
    pub fn open_directions(&self, cell: CellCoord) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_open(cell, *direction))
            .collect()
    }

    /// Reports whether an entity may step from `from` to the adjacent cell `to`.
    #[must_use]
    pub fn is_walkable(&self, from: CellCoord, to: CellCoord) -> bool {
        if !self.is_interior(from) || !self.is_interior(to) {
            return false;
        }
        from.direction_to(to)
            .is_some_and(|direction| self.is_open(from, direction))
    }

    /// Reports whether the pixel is part of a wall.
    ///
    /// Pixels outside the maze are not walls; they are handled by
    /// [`MazeLayout::is_inside_walls`].
    #[must_use]
    pub fn has_pixel(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.pixel_width() || y >= self.pixel_height() {
            return false;
        }
        let cell = CellCoord::new(
            u32::try_from(x / CELL_WIDTH).unwrap_or(u32::MAX),
            u32::try_from(y / CELL_HEIGHT).unwrap_or(u32::MAX),
        );
        let Some(mask) = self.mask(cell) else {
            return true;
        };

        let px = x % CELL_WIDTH;
        let py = y % CELL_HEIGHT;
        (mask.blocks_right() && px >= 10) || (mask.blocks_down() && (8..=9).contains(&py))
    }

    /// Reports whether a pixel position lies strictly inside the outer walls.
    #[must_use]
    pub fn is_inside_walls(&self, point: PixelPoint) -> bool {
        let right = (self.pixel_width() - CELL_WIDTH - 4) as f32;
        let bottom = (self.pixel_height() - CELL_HEIGHT) as f32;
        point.x > CELL_WIDTH as f32
            && point.y > CELL_HEIGHT as f32
            && point.x < right
            && point.y < bottom
    }

    /// Pixel position of the upper-left corner of a cell.
    #[must_use]
    pub fn cell_position(&self, cell: CellCoord) -> PixelPoint {
        cell.top_left()
    }

    /// Cell the position snaps to, when it is exactly grid-aligned.
    #[must_use]
    pub fn aligned_cell(point: PixelPoint) -> Option<CellCoord> {
        let x = point.pixel_x();
        let y = point.pixel_y();
        if x % CELL_WIDTH != 0 || y % CELL_HEIGHT != 0 {
            return None;
        }
        CellCoord::containing(point)
    }
}

/// Overlap test between a bullet and a character sprite sharing the same pivot.
#[must_use]
pub fn bullet_hits(bullet: PixelPoint, body: PixelPoint) -> bool {
    (body.x - bullet.x + SPRITE_PIVOT_X).abs() <= SPRITE_PIVOT_X
        && (body.y - bullet.y + SPRITE_PIVOT_Y).abs() <= SPRITE_PIVOT_Y
}

#[cfg(test)]
mod tests {
    use super::{bullet_hits, LayoutError, MazeLayout, WallMask};
    use crate::{CellCoord, Direction, PixelPoint};

    fn walled_layout() -> MazeLayout {
        let rows = vec![
            vec![0, 0, 0, 0, 0],
            vec![0, 1, 0, 0, 0],
            vec![0, 2, 3, 0, 0],
            vec![0, 0, 0, 0, 0],
        ];
        MazeLayout::from_rows("walled", &rows).expect("layout builds")
    }

    #[test]
    fn right_wall_blocks_both_sides() {
        let layout = walled_layout();
        let left = CellCoord::new(1, 1);
        let right = CellCoord::new(2, 1);
        assert!(!layout.is_open(left, Direction::East));
        assert!(!layout.is_open(right, Direction::West));
        assert!(!layout.is_walkable(left, right));
        assert!(!layout.is_walkable(right, left));
    }

    #[test]
    fn bottom_wall_blocks_both_sides() {
        let layout = walled_layout();
        let upper = CellCoord::new(1, 2);
        let lower = CellCoord::new(1, 3);
        assert!(!layout.is_walkable(upper, lower));
        assert!(!layout.is_walkable(lower, upper));
        assert!(layout.is_walkable(CellCoord::new(3, 1), CellCoord::new(3, 2)));
    }

    #[test]
    fn boundary_cells_are_blocked() {
        let layout = walled_layout();
        assert!(layout.open_directions(CellCoord::new(0, 1)).is_empty());
        assert!(layout.open_directions(CellCoord::new(9, 9)).is_empty());
        assert!(!layout.is_open(CellCoord::new(4, 1), Direction::East));
        assert!(!layout.is_open(CellCoord::new(3, 3), Direction::South));
    }

    #[test]
    fn only_the_first_row_and_column_are_outside_the_interior() {
        let layout = MazeLayout::open("open", 13, 8);
        assert!(!layout.is_interior(CellCoord::new(0, 4)));
        assert!(!layout.is_interior(CellCoord::new(5, 0)));
        assert!(layout.is_interior(CellCoord::new(12, 7)));
        assert!(!layout.is_interior(CellCoord::new(13, 7)));

        let corner = CellCoord::new(12, 7);
        assert!(!layout.is_open(corner, Direction::East), "the layout edge is a wall");
        assert!(!layout.is_open(corner, Direction::South), "the layout edge is a wall");
        assert!(layout.is_open(corner, Direction::West));
        assert!(!layout.is_open(CellCoord::new(1, 1), Direction::North));
    }

    #[test]
    fn ragged_rows_are_padded() {
        let rows = vec![vec![1, 2, 3], vec![1]];
        let layout = MazeLayout::from_rows("ragged", &rows).expect("layout builds");
        assert_eq!(layout.width(), 3);
        assert_eq!(layout.mask(CellCoord::new(2, 1)), Some(WallMask::OPEN));
    }

    #[test]
    fn empty_rows_are_rejected() {
        let error = MazeLayout::from_rows("void", &[]).expect_err("empty layout");
        assert_eq!(
            error,
            LayoutError::Empty {
                name: "void".to_owned()
            }
        );
    }

    #[test]
    fn wall_pixels_follow_masks() {
        let layout = walled_layout();
        assert!(layout.has_pixel(12 + 10, 10 + 2));
        assert!(!layout.has_pixel(12 + 9, 10 + 2));
        assert!(layout.has_pixel(12 + 3, 20 + 8));
        assert!(!layout.has_pixel(-4, 5));
    }

    #[test]
    fn bullet_overlap_is_pivot_sized() {
        let body = PixelPoint::new(24.0, 20.0);
        assert!(bullet_hits(PixelPoint::new(28.0, 24.0), body));
        assert!(!bullet_hits(PixelPoint::new(37.0, 24.0), body));
    }
}
