//! Scoring constraints: grid size, resource budgets, affinities, weights.
//!
//! [`Constraints`] can only be obtained through [`ConstraintsBuilder::build`],
//! which rejects non-positive grids, budgets and degenerate weights. Scoring
//! can therefore never divide by zero or produce NaN.

use crate::grid::GridSize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Module keys treated as accessibility anchors when none are configured.
pub const DEFAULT_ANCHOR_KEYS: &[&str] = &["galley", "life", "medical"];

/// Module keys treated as crew areas for safety scoring when none are configured.
pub const DEFAULT_CREW_KEYS: &[&str] = &["sleep", "galley", "life"];

/// Errors from constraint validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintError {
    #[error("grid must be at least 1x1, got {cols}x{rows}")]
    InvalidGrid { cols: u32, rows: u32 },
    #[error("{field} must be finite and > 0, got {value}")]
    NonPositiveBudget { field: &'static str, value: f64 },
    #[error("{field} weight must be finite and >= 0, got {value}")]
    InvalidWeight { field: &'static str, value: f64 },
    #[error("at least one score weight must be > 0")]
    ZeroWeights,
}

// ---------------------------------------------------------------------------
// Weights / affinities
// ---------------------------------------------------------------------------

/// Relative weights of the five soft criteria. Normalized by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub resource: f64,
    pub accessibility: f64,
    pub adjacency: f64,
    pub clustering: f64,
    pub safety: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            resource: 0.30,
            accessibility: 0.25,
            adjacency: 0.20,
            clustering: 0.15,
            safety: 0.10,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.resource + self.accessibility + self.adjacency + self.clustering + self.safety
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        let fields = [
            ("resource", self.resource),
            ("accessibility", self.accessibility),
            ("adjacency", self.adjacency),
            ("clustering", self.clustering),
            ("safety", self.safety),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConstraintError::InvalidWeight { field, value });
            }
        }
        if self.sum() <= 0.0 {
            return Err(ConstraintError::ZeroWeights);
        }
        Ok(())
    }
}

/// Which modules a module wants next to it, and which it does not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affinity {
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub hates: BTreeSet<String>,
}

impl Affinity {
    pub fn new<L, H>(likes: L, hates: H) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        Self {
            likes: likes.into_iter().map(Into::into).collect(),
            hates: hates.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Validated scoring constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraints {
    grid: GridSize,
    max_volume: f64,
    max_power: f64,
    affinities: BTreeMap<String, Affinity>,
    airlock_key: Option<String>,
    weights: Weights,
    anchor_keys: BTreeSet<String>,
    crew_keys: BTreeSet<String>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            max_volume: 600.0,
            max_power: 300.0,
            affinities: BTreeMap::new(),
            airlock_key: None,
            weights: Weights::default(),
            anchor_keys: DEFAULT_ANCHOR_KEYS.iter().map(|k| k.to_string()).collect(),
            crew_keys: DEFAULT_CREW_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Constraints {
    /// Start from the defaults: 16x12 grid, 600 m³, 300 W.
    pub fn builder() -> ConstraintsBuilder {
        ConstraintsBuilder {
            inner: Constraints::default(),
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn max_volume(&self) -> f64 {
        self.max_volume
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    pub fn affinities(&self) -> &BTreeMap<String, Affinity> {
        &self.affinities
    }

    pub fn airlock_key(&self) -> Option<&str> {
        self.airlock_key.as_deref()
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn is_anchor(&self, key: &str) -> bool {
        self.anchor_keys.contains(key)
    }

    pub fn is_crew(&self, key: &str) -> bool {
        self.crew_keys.contains(key)
    }

    pub fn anchor_keys(&self) -> impl Iterator<Item = &str> {
        self.anchor_keys.iter().map(String::as_str)
    }

    pub fn crew_keys(&self) -> impl Iterator<Item = &str> {
        self.crew_keys.iter().map(String::as_str)
    }

    /// Reopen these constraints for editing.
    pub fn to_builder(&self) -> ConstraintsBuilder {
        ConstraintsBuilder {
            inner: self.clone(),
        }
    }
}

/// Builder that validates on [`build`](ConstraintsBuilder::build).
#[derive(Debug, Clone)]
pub struct ConstraintsBuilder {
    inner: Constraints,
}

impl ConstraintsBuilder {
    pub fn grid(mut self, cols: u32, rows: u32) -> Self {
        self.inner.grid = GridSize::new(cols, rows);
        self
    }

    pub fn max_volume(mut self, max_volume: f64) -> Self {
        self.inner.max_volume = max_volume;
        self
    }

    pub fn max_power(mut self, max_power: f64) -> Self {
        self.inner.max_power = max_power;
        self
    }

    pub fn affinity(mut self, key: impl Into<String>, affinity: Affinity) -> Self {
        self.inner.affinities.insert(key.into(), affinity);
        self
    }

    pub fn affinities(mut self, affinities: BTreeMap<String, Affinity>) -> Self {
        self.inner.affinities = affinities;
        self
    }

    pub fn airlock_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.inner.airlock_key = key.map(Into::into);
        self
    }

    pub fn weights(mut self, weights: Weights) -> Self {
        self.inner.weights = weights;
        self
    }

    pub fn anchor_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.inner.anchor_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn crew_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.inner.crew_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Constraints, ConstraintError> {
        let c = self.inner;
        if c.grid.cols == 0 || c.grid.rows == 0 {
            return Err(ConstraintError::InvalidGrid {
                cols: c.grid.cols,
                rows: c.grid.rows,
            });
        }
        for (field, value) in [("max_volume", c.max_volume), ("max_power", c.max_power)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConstraintError::NonPositiveBudget { field, value });
            }
        }
        c.weights.validate()?;
        Ok(c)
    }
}
