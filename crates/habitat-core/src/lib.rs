//! Habitat Core -- layout engine for space-habitat floor plans.
//!
//! Modules from a fixed catalog are placed on a bounded grid, scored against
//! resource budgets and spatial criteria, and improved by a stochastic local
//! search. The crate does no file or network I/O; see `habitat-data` for
//! loading catalogs and constraints from disk.
//!
//! # Pipeline
//!
//! 1. **Catalog** -- build an immutable [`catalog::Catalog`] of module types.
//! 2. **Layout** -- place, move, rotate and remove modules on a
//!    [`layout::LayoutStore`]. Every mutation is collision-checked and a
//!    rejected mutation changes nothing.
//! 3. **Score** -- [`scoring::evaluate`] turns a layout and
//!    [`constraints::Constraints`] into a 0..=100 score with a breakdown and
//!    any hard violations.
//! 4. **Optimize** -- [`optimizer::optimize`] hill-climbs from a layout and
//!    never returns a worse one.
//!
//! ```rust
//! use habitat_core::prelude::*;
//!
//! let catalog = Catalog::default_habitat();
//! let constraints = Constraints::builder().airlock_key(Some("airlock")).build()?;
//! let mut layout = LayoutStore::new(constraints.grid());
//! layout.place(catalog.require("galley")?, GridPosition::new(0, 0), Rotation::None)?;
//! layout.place(catalog.require("airlock")?, GridPosition::new(10, 8), Rotation::None)?;
//!
//! let before = evaluate(&layout, &constraints).score;
//! let outcome = optimize(&layout, &constraints, 200);
//! assert!(outcome.score >= before);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Key Types
//!
//! - [`grid::Rotation`] / [`grid::Footprint`] -- quarter-turn orientation and
//!   the rotated cell rectangle it implies.
//! - [`layout::PlacementId`] -- per-layout id, never reused.
//! - [`document::LayoutDocument`] -- JSON save format, re-validated on import.
//! - [`snapshot`] -- versioned bitcode snapshots for undo stacks.

pub mod catalog;
pub mod constraints;
pub mod document;
pub mod grid;
pub mod layout;
pub mod optimizer;
pub mod rng;
pub mod scoring;
pub mod snapshot;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Commonly used types.
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogError, ModuleType};
    pub use crate::constraints::{Affinity, Constraints, ConstraintError, Weights};
    pub use crate::document::{DocumentError, LayoutDocument};
    pub use crate::grid::{Footprint, GridPosition, GridSize, Rotation, RotationDirection};
    pub use crate::layout::{LayoutError, LayoutStore, Placement, PlacementId};
    pub use crate::optimizer::{CancelToken, OptimizeOutcome, Optimizer, OptimizerConfig, optimize};
    pub use crate::scoring::{ScoreResult, evaluate};
}
