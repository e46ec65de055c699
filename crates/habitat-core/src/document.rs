//! Persisted layout format.
//!
//! A [`LayoutDocument`] is the JSON shape layouts are saved and exported in:
//!
//! ```json
//! { "layout": [{ "id": 1, "module": { ... }, "x": 0, "y": 0, "rotation": 0 }],
//!   "cols": 16, "rows": 12, "cellSize": 48 }
//! ```
//!
//! Each record embeds its full module type so a document stands on its own.
//! Import never trusts the file: every placement goes back through the
//! layout store's collision checks.

use crate::catalog::{Catalog, CatalogError, ModuleType};
use crate::grid::{GridPosition, GridSize, InvalidRotation, Rotation};
use crate::layout::{LayoutError, LayoutStore, Placement, PlacementId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Pixel size of one grid cell used by editors when none is stored.
pub const DEFAULT_CELL_SIZE: u32 = 48;

fn default_cell_size() -> u32 {
    DEFAULT_CELL_SIZE
}

/// Errors from reading or importing a layout document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("layout JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("placement {id}: {source}")]
    InvalidRotation {
        id: PlacementId,
        #[source]
        source: InvalidRotation,
    },
    #[error("document grid must be at least 1x1, got {cols}x{rows}")]
    InvalidGrid { cols: u32, rows: u32 },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// One placement as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: PlacementId,
    pub module: ModuleType,
    pub x: i32,
    pub y: i32,
    /// Quarter turns clockwise, `0..=3`.
    #[serde(default)]
    pub rotation: u8,
}

/// A saved layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub layout: Vec<PlacementRecord>,
    pub cols: u32,
    pub rows: u32,
    #[serde(rename = "cellSize", default = "default_cell_size")]
    pub cell_size: u32,
}

impl LayoutDocument {
    /// Capture a store in document form.
    pub fn from_store(store: &LayoutStore, cell_size: u32) -> Self {
        let grid = store.grid();
        Self {
            layout: store
                .placements()
                .iter()
                .map(|p| PlacementRecord {
                    id: p.id,
                    module: ModuleType::clone(&p.module),
                    x: p.position.x,
                    y: p.position.y,
                    rotation: p.rotation.quarter_turns(),
                })
                .collect(),
            cols: grid.cols,
            rows: grid.rows,
            cell_size,
        }
    }

    pub fn grid(&self) -> GridSize {
        GridSize::new(self.cols, self.rows)
    }

    /// Rebuild a store from the embedded module types.
    ///
    /// Records with identical module definitions share one
    /// `Arc<ModuleType>`. Two records may carry the same key with different
    /// definitions, and each keeps its own.
    pub fn into_store(self) -> Result<LayoutStore, DocumentError> {
        self.into_store_with_next_id(1)
    }

    /// Like [`into_store`](Self::into_store), but the store will not hand out
    /// ids below `next_id`.
    pub(crate) fn into_store_with_next_id(self, next_id: u64) -> Result<LayoutStore, DocumentError> {
        let mut shared: HashMap<String, Vec<Arc<ModuleType>>> = HashMap::new();
        self.build_store(next_id, |record| {
            let variants = shared.entry(record.module.key().to_string()).or_default();
            if let Some(existing) = variants.iter().find(|m| ***m == record.module) {
                return Ok(Arc::clone(existing));
            }
            let module = Arc::new(record.module.clone());
            variants.push(Arc::clone(&module));
            Ok(module)
        })
    }

    /// Rebuild a store, resolving every record's module key against
    /// `catalog` instead of the embedded definition.
    pub fn into_store_with_catalog(self, catalog: &Catalog) -> Result<LayoutStore, DocumentError> {
        self.build_store(1, |record| Ok(catalog.require(record.module.key())?))
    }

    fn build_store<F>(self, next_id: u64, mut resolve: F) -> Result<LayoutStore, DocumentError>
    where
        F: FnMut(&PlacementRecord) -> Result<Arc<ModuleType>, DocumentError>,
    {
        if self.cols == 0 || self.rows == 0 {
            return Err(DocumentError::InvalidGrid {
                cols: self.cols,
                rows: self.rows,
            });
        }
        let grid = self.grid();

        let mut placements = Vec::with_capacity(self.layout.len());
        for record in &self.layout {
            let rotation = Rotation::try_from(record.rotation).map_err(|source| {
                DocumentError::InvalidRotation {
                    id: record.id,
                    source,
                }
            })?;
            placements.push(Placement {
                id: record.id,
                module: resolve(record)?,
                position: GridPosition::new(record.x, record.y),
                rotation,
            });
        }

        let store = LayoutStore::from_placements(grid, placements, next_id)?;
        log::debug!("imported layout with {} placements", store.len());
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }
}
