//! Layout store: the collision-free set of module placements on a grid.
//!
//! Every public mutation is validated with [`grid::is_free`] before it is
//! applied, and a rejected mutation leaves the store untouched. The store
//! therefore upholds two invariants at all times:
//!
//! - every placement's effective footprint lies inside the grid, and
//! - no two effective footprints overlap.

use crate::catalog::ModuleType;
use crate::grid::{self, Footprint, GridPosition, GridSize, Rect, Rotation, RotationDirection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies a placement within one layout. Never reused by that layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(pub u64);

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One module instance positioned and oriented on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: PlacementId,
    pub module: Arc<ModuleType>,
    pub position: GridPosition,
    pub rotation: Rotation,
}

impl Placement {
    /// Rotation-adjusted footprint.
    pub fn footprint(&self) -> Footprint {
        grid::footprint(&self.module, self.rotation)
    }

    /// The cells this placement covers.
    pub fn rect(&self) -> Rect {
        self.footprint().at(self.position)
    }

    pub fn key(&self) -> &str {
        self.module.key()
    }
}

/// Errors from layout store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The target rectangle leaves the grid or overlaps another placement.
    #[error("{width}x{height} footprint at ({x}, {y}) collides or leaves the grid")]
    Collision {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("placement {0} not found")]
    NotFound(PlacementId),
    #[error("duplicate placement id {0}")]
    DuplicateId(PlacementId),
    /// No id is left to hand out after this one.
    #[error("placement id space exhausted at {0}")]
    IdSpaceExhausted(PlacementId),
}

impl LayoutError {
    fn collision(rect: &Rect) -> Self {
        LayoutError::Collision {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutStore
// ---------------------------------------------------------------------------

/// An ordered, collision-free collection of placements on a bounded grid.
///
/// Iteration order is insertion order, which keeps scoring and optimizer
/// tie-breaks deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStore {
    grid: GridSize,
    placements: Vec<Placement>,
    next_id: u64,
}

impl LayoutStore {
    /// Create an empty layout on a grid of the given size.
    pub fn new(grid: GridSize) -> Self {
        Self {
            grid,
            placements: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a store from existing placements, keeping their ids.
    ///
    /// Placements are re-validated one by one, so an untrusted source can
    /// never produce a store that breaks the invariants. `next_id` is raised
    /// past every imported id.
    pub fn from_placements<I>(grid: GridSize, placements: I, next_id: u64) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = Placement>,
    {
        let mut store = Self::new(grid);
        let mut seen = HashSet::new();
        for placement in placements {
            if !seen.insert(placement.id) {
                return Err(LayoutError::DuplicateId(placement.id));
            }
            let rect = placement.rect();
            if !store.is_free(None, &rect) {
                return Err(LayoutError::collision(&rect));
            }
            let after = placement
                .id
                .0
                .checked_add(1)
                .ok_or(LayoutError::IdSpaceExhausted(placement.id))?;
            store.next_id = store.next_id.max(after);
            store.placements.push(placement);
        }
        store.next_id = store.next_id.max(next_id);
        Ok(store)
    }

    // -- Queries --

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn get(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// The id the next successful [`place`](Self::place) will assign.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Whether `rect` is legal for a placement other than `exclude`.
    pub fn is_free(&self, exclude: Option<PlacementId>, rect: &Rect) -> bool {
        grid::is_free(&self.placements, exclude, rect, self.grid)
    }

    /// Whether a module could be placed at `position` with `rotation`.
    pub fn can_place(&self, module: &ModuleType, position: GridPosition, rotation: Rotation) -> bool {
        let rect = grid::footprint(module, rotation).at(position);
        self.is_free(None, &rect)
    }

    /// Check both invariants over the whole layout.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for placement in &self.placements {
            let rect = placement.rect();
            if !self.is_free(Some(placement.id), &rect) {
                return Err(LayoutError::collision(&rect));
            }
        }
        Ok(())
    }

    fn index_of(&self, id: PlacementId) -> Result<usize, LayoutError> {
        self.placements
            .iter()
            .position(|p| p.id == id)
            .ok_or(LayoutError::NotFound(id))
    }

    // -- Mutations --

    /// Place a module with its top-left cell at `position`.
    pub fn place(
        &mut self,
        module: Arc<ModuleType>,
        position: GridPosition,
        rotation: Rotation,
    ) -> Result<PlacementId, LayoutError> {
        let rect = grid::footprint(&module, rotation).at(position);
        if !self.is_free(None, &rect) {
            log::debug!("rejected placement of '{}' at {:?}", module.key(), position);
            return Err(LayoutError::collision(&rect));
        }

        let id = PlacementId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(LayoutError::IdSpaceExhausted(id))?;
        self.placements.push(Placement {
            id,
            module,
            position,
            rotation,
        });
        Ok(id)
    }

    /// Move a placement, keeping its rotation.
    pub fn move_to(&mut self, id: PlacementId, position: GridPosition) -> Result<(), LayoutError> {
        let index = self.index_of(id)?;
        let rect = self.placements[index].footprint().at(position);
        if !self.is_free(Some(id), &rect) {
            log::debug!("rejected move of {id} to {position:?}");
            return Err(LayoutError::collision(&rect));
        }
        self.placements[index].position = position;
        Ok(())
    }

    /// Rotate a placement one quarter turn in place.
    pub fn rotate(&mut self, id: PlacementId, direction: RotationDirection) -> Result<(), LayoutError> {
        let index = self.index_of(id)?;
        let placement = &self.placements[index];
        let rotation = placement.rotation.step(direction);
        let rect = grid::footprint(&placement.module, rotation).at(placement.position);
        if !self.is_free(Some(id), &rect) {
            log::debug!("rejected rotation of {id} to {rotation:?}");
            return Err(LayoutError::collision(&rect));
        }
        self.placements[index].rotation = rotation;
        Ok(())
    }

    /// Remove a placement. Returns it.
    pub fn remove(&mut self, id: PlacementId) -> Result<Placement, LayoutError> {
        let index = self.index_of(id)?;
        Ok(self.placements.remove(index))
    }

    /// Exchange the origins of two placements without any legality check.
    ///
    /// Callers must validate the affected placements afterwards and discard
    /// the store if they collide.
    pub(crate) fn swap_positions(&mut self, a: PlacementId, b: PlacementId) -> Result<(), LayoutError> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let pa = self.placements[ia].position;
        self.placements[ia].position = self.placements[ib].position;
        self.placements[ib].position = pa;
        Ok(())
    }

    /// Set a placement's origin by index without validation.
    pub(crate) fn set_position_unchecked(&mut self, index: usize, position: GridPosition) {
        self.placements[index].position = position;
    }
}
