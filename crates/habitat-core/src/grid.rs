//! Grid geometry: positions, rotation-aware footprints, bounds and overlap
//! tests.
//!
//! [`is_free`] is the single legality check for the whole engine. Every
//! mutation of a [`LayoutStore`](crate::layout::LayoutStore) and every
//! optimizer perturbation goes through it.

use crate::catalog::ModuleType;
use crate::layout::{Placement, PlacementId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A cell position on the grid. Origin is the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u64 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        dx + dy
    }

    /// Manhattan distance to a fractional point (e.g. the grid center).
    pub fn manhattan_distance_to_point(&self, px: f64, py: f64) -> f64 {
        (f64::from(self.x) - px).abs() + (f64::from(self.y) - py).abs()
    }
}

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub cols: u32,
    pub rows: u32,
}

impl GridSize {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    /// Geometric center `(cols / 2, rows / 2)`.
    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.cols) / 2.0, f64::from(self.rows) / 2.0)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self { cols: 16, rows: 12 }
    }
}

/// The size of a module on the grid, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 module.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// Return a new footprint rotated by the given rotation.
    /// For 90/270 degrees, width and height are swapped.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            Self {
                width: self.height,
                height: self.width,
            }
        } else {
            *self
        }
    }

    /// The rectangle this footprint covers with its top-left cell at `origin`.
    pub fn at(&self, origin: GridPosition) -> Rect {
        Rect {
            x: origin.x,
            y: origin.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Quarter-turn rotation of a placement.
///
/// Persisted as its quarter-turn count (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

/// Rotation step requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    /// Interpret a `+1` / `-1` step. Any other value is not a direction.
    pub fn from_step(step: i32) -> Option<Self> {
        match step {
            1 => Some(RotationDirection::Clockwise),
            -1 => Some(RotationDirection::CounterClockwise),
            _ => None,
        }
    }
}

/// A quarter-turn value outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rotation must be 0..=3 quarter turns, got {0}")]
pub struct InvalidRotation(pub u8);

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw270,
            Rotation::Cw90 => Rotation::None,
            Rotation::Cw180 => Rotation::Cw90,
            Rotation::Cw270 => Rotation::Cw180,
        }
    }

    /// Apply one step in the given direction.
    pub fn step(self, direction: RotationDirection) -> Self {
        match direction {
            RotationDirection::Clockwise => self.rotate_cw(),
            RotationDirection::CounterClockwise => self.rotate_ccw(),
        }
    }

    /// Number of clockwise quarter turns (0..=3).
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Build a rotation from any number of quarter turns, reduced mod 4.
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => Rotation::None,
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            _ => Rotation::Cw270,
        }
    }

    /// Odd quarter turns swap width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> Self {
        rotation.quarter_turns()
    }
}

impl TryFrom<u8> for Rotation {
    type Error = InvalidRotation;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 3 {
            return Err(InvalidRotation(value));
        }
        Ok(Rotation::from_quarter_turns(u32::from(value)))
    }
}

/// An axis-aligned rectangle of cells, half-open on the right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn origin(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Legality
// ---------------------------------------------------------------------------

/// Effective footprint of a module at the given rotation.
pub fn footprint(module: &ModuleType, rotation: Rotation) -> Footprint {
    module.footprint().rotated(rotation)
}

/// Whether `rect` lies entirely inside `[0, cols) x [0, rows)`.
pub fn fits_in_bounds(rect: &Rect, grid: GridSize) -> bool {
    rect.x >= 0
        && rect.y >= 0
        && rect.right() <= i64::from(grid.cols)
        && rect.bottom() <= i64::from(grid.rows)
}

/// Half-open rectangle intersection. Rectangles sharing only an edge do not
/// overlap.
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    i64::from(a.x) < b.right()
        && i64::from(b.x) < a.right()
        && i64::from(a.y) < b.bottom()
        && i64::from(b.y) < a.bottom()
}

/// Whether `rect` is in bounds and overlaps no placement other than `exclude`.
pub fn is_free<'a, I>(placements: I, exclude: Option<PlacementId>, rect: &Rect, grid: GridSize) -> bool
where
    I: IntoIterator<Item = &'a Placement>,
{
    if !fits_in_bounds(rect, grid) {
        return false;
    }
    placements
        .into_iter()
        .filter(|p| Some(p.id) != exclude)
        .all(|p| !overlaps(&p.rect(), rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleType;
    use std::sync::Arc;

    fn module(width: u32, height: u32) -> ModuleType {
        ModuleType::new("test", "Test", 1.0, 1.0, width, height).unwrap()
    }

    fn placement(id: u64, x: i32, y: i32, width: u32, height: u32) -> Placement {
        Placement {
            id: PlacementId(id),
            module: Arc::new(module(width, height)),
            position: GridPosition::new(x, y),
            rotation: Rotation::None,
        }
    }

    // -----------------------------------------------------------------------
    // GridPosition tests
    // -----------------------------------------------------------------------

    #[test]
    fn grid_position_manhattan_distance() {
        let a = GridPosition::new(0, 0);
        let b = GridPosition::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7);

        let c = GridPosition::new(-2, 5);
        let d = GridPosition::new(3, -1);
        assert_eq!(c.manhattan_distance(&d), 11);

        assert_eq!(a.manhattan_distance(&a), 0);

        let far = GridPosition::new(i32::MIN, i32::MIN);
        let near = GridPosition::new(i32::MAX, i32::MAX);
        assert_eq!(far.manhattan_distance(&near), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn distance_to_fractional_center() {
        let grid = GridSize::new(5, 3);
        let (cx, cy) = grid.center();
        let pos = GridPosition::new(0, 0);
        assert_eq!(pos.manhattan_distance_to_point(cx, cy), 4.0);
    }

    // -----------------------------------------------------------------------
    // Rotation / footprint tests
    // -----------------------------------------------------------------------

    #[test]
    fn odd_rotation_swaps_axes() {
        let m = module(2, 1);
        assert_eq!(footprint(&m, Rotation::None), Footprint::new(2, 1));
        assert_eq!(footprint(&m, Rotation::Cw90), Footprint::new(1, 2));
        assert_eq!(footprint(&m, Rotation::Cw180), Footprint::new(2, 1));
        assert_eq!(footprint(&m, Rotation::Cw270), Footprint::new(1, 2));
    }

    #[test]
    fn footprint_repeats_every_four_turns() {
        let m = module(3, 1);
        for turns in 0..4u32 {
            let r = Rotation::from_quarter_turns(turns);
            let r4 = Rotation::from_quarter_turns(turns + 4);
            assert_eq!(footprint(&m, r), footprint(&m, r4));
        }
    }

    #[test]
    fn rotation_steps_wrap() {
        assert_eq!(Rotation::Cw270.rotate_cw(), Rotation::None);
        assert_eq!(Rotation::None.rotate_ccw(), Rotation::Cw270);
        for r in Rotation::all() {
            assert_eq!(r.rotate_cw().rotate_ccw(), r);
        }
    }

    #[test]
    fn step_direction_from_unit_step() {
        assert_eq!(RotationDirection::from_step(1), Some(RotationDirection::Clockwise));
        assert_eq!(
            RotationDirection::from_step(-1),
            Some(RotationDirection::CounterClockwise)
        );
        assert_eq!(RotationDirection::from_step(0), None);
        assert_eq!(RotationDirection::from_step(2), None);
        assert_eq!(
            Rotation::None.step(RotationDirection::CounterClockwise),
            Rotation::Cw270
        );
    }

    #[test]
    fn rotation_serializes_as_quarter_turns() {
        let json = serde_json::to_string(&Rotation::Cw180).unwrap();
        assert_eq!(json, "2");
        let back: Rotation = serde_json::from_str("3").unwrap();
        assert_eq!(back, Rotation::Cw270);
        assert!(serde_json::from_str::<Rotation>("4").is_err());
    }

    // -----------------------------------------------------------------------
    // Bounds / overlap tests
    // -----------------------------------------------------------------------

    #[test]
    fn bounds_are_half_open() {
        let grid = GridSize::new(16, 12);
        assert!(fits_in_bounds(&Rect::new(14, 0, 2, 1), grid));
        assert!(!fits_in_bounds(&Rect::new(15, 0, 2, 1), grid));
        assert!(fits_in_bounds(&Rect::new(0, 11, 1, 1), grid));
        assert!(!fits_in_bounds(&Rect::new(0, 11, 1, 2), grid));
        assert!(!fits_in_bounds(&Rect::new(-1, 0, 1, 1), grid));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0, 0, 2, 1);
        let right = Rect::new(2, 0, 1, 1);
        let below = Rect::new(0, 1, 2, 1);
        assert!(!overlaps(&a, &right));
        assert!(!overlaps(&a, &below));
        assert!(overlaps(&a, &Rect::new(1, 0, 1, 1)));
        assert!(overlaps(&Rect::new(0, 0, 3, 3), &Rect::new(1, 1, 1, 1)));
    }

    #[test]
    fn is_free_respects_exclusion() {
        let grid = GridSize::new(4, 4);
        let placements = vec![placement(1, 0, 0, 2, 2)];
        let rect = Rect::new(1, 1, 1, 1);
        assert!(!is_free(&placements, None, &rect, grid));
        assert!(is_free(&placements, Some(PlacementId(1)), &rect, grid));
        assert!(is_free(&placements, None, &Rect::new(2, 2, 2, 2), grid));
        assert!(!is_free(&placements, None, &Rect::new(3, 3, 2, 1), grid));
    }
}
