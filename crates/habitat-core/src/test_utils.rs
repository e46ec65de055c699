//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{Catalog, ModuleType};
use crate::constraints::{Affinity, Constraints};
use crate::grid::{GridPosition, GridSize, Rotation};
use crate::layout::{LayoutStore, PlacementId};
use std::sync::Arc;

// ===========================================================================
// Module constructors
// ===========================================================================

/// An ad-hoc module type. Panics on invalid input.
pub fn module(key: &str, volume: f64, power: f64, width: u32, height: u32) -> Arc<ModuleType> {
    Arc::new(ModuleType::new(key, key, volume, power, width, height).expect("valid test module"))
}

pub fn stock(key: &str) -> Arc<ModuleType> {
    Catalog::default_habitat()
        .require(key)
        .expect("stock module key")
}

// ===========================================================================
// Layout builders
// ===========================================================================

pub fn empty_layout() -> LayoutStore {
    LayoutStore::new(GridSize::default())
}

/// Place and unwrap.
pub fn place(layout: &mut LayoutStore, module: Arc<ModuleType>, x: i32, y: i32) -> PlacementId {
    layout
        .place(module, GridPosition::new(x, y), Rotation::None)
        .expect("test placement must be legal")
}

/// A 16x12 layout with the crew modules spread toward the corners.
pub fn scattered_crew_layout() -> LayoutStore {
    let mut layout = empty_layout();
    place(&mut layout, stock("galley"), 0, 0);
    place(&mut layout, stock("life"), 14, 11);
    place(&mut layout, stock("medical"), 15, 0);
    place(&mut layout, stock("sleep"), 0, 11);
    place(&mut layout, stock("lab"), 7, 0);
    place(&mut layout, stock("gym"), 3, 9);
    place(&mut layout, stock("airlock"), 8, 6);
    layout
}

/// Fill the default grid row by row with every stock module until
/// `count` placements exist or the grid runs out of room.
pub fn packed_layout(count: usize) -> LayoutStore {
    let catalog = Catalog::default_habitat();
    let modules: Vec<Arc<ModuleType>> = catalog.iter().cloned().collect();
    let mut layout = empty_layout();
    let grid = layout.grid();
    let (mut x, mut y) = (0i32, 0i32);
    let mut next = 0;
    while layout.len() < count && (y as u32) < grid.rows {
        let module = Arc::clone(&modules[next % modules.len()]);
        let width = module.width() as i32;
        if (x + width) as u32 > grid.cols {
            x = 0;
            y += 1;
            continue;
        }
        // Leave a gap between placements so the optimizer has room.
        if layout.place(module, GridPosition::new(x, y), Rotation::None).is_ok() {
            next += 1;
        }
        x += width + 1;
    }
    layout
}

// ===========================================================================
// Constraints
// ===========================================================================

/// Default budgets with a few affinities and the stock airlock configured.
pub fn habitat_constraints() -> Constraints {
    Constraints::builder()
        .affinity("sleep", Affinity::new(["medical"], ["gym"]))
        .affinity("galley", Affinity::new(["life"], Vec::<String>::new()))
        .airlock_key(Some("airlock"))
        .build()
        .expect("valid test constraints")
}
