//! Immutable module catalog.
//!
//! Module types are registered through a [`CatalogBuilder`], validated once,
//! and then shared as `Arc<ModuleType>` by every placement that uses them.
//! Nothing in the engine mutates a module type after the catalog is built.

use crate::grid::Footprint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors from building or querying a catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("module '{key}' has invalid size {width}x{height} (both must be >= 1)")]
    InvalidSize { key: String, width: u32, height: u32 },
    #[error("module '{key}' has invalid {field} {value} (must be finite and >= 0)")]
    InvalidResource {
        key: String,
        field: &'static str,
        value: f64,
    },
    #[error("module key must not be empty")]
    EmptyKey,
    #[error("duplicate module key '{0}'")]
    DuplicateKey(String),
    #[error("unknown module key '{0}'")]
    UnknownKey(String),
}

// ---------------------------------------------------------------------------
// ModuleType
// ---------------------------------------------------------------------------

/// A catalog entry: one kind of habitat module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModuleTypeData")]
pub struct ModuleType {
    key: String,
    name: String,
    volume: f64,
    power: f64,
    width: u32,
    height: u32,
}

/// Unvalidated wire form of a module type. Accepts the short `w`/`h` names.
#[derive(Debug, Clone, Deserialize)]
struct ModuleTypeData {
    key: String,
    name: String,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    power: f64,
    #[serde(alias = "w", default = "one")]
    width: u32,
    #[serde(alias = "h", default = "one")]
    height: u32,
}

fn one() -> u32 {
    1
}

impl TryFrom<ModuleTypeData> for ModuleType {
    type Error = CatalogError;

    fn try_from(data: ModuleTypeData) -> Result<Self, Self::Error> {
        ModuleType::new(
            data.key,
            data.name,
            data.volume,
            data.power,
            data.width,
            data.height,
        )
    }
}

impl ModuleType {
    /// Create a validated module type. Keys are trimmed.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        volume: f64,
        power: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, CatalogError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        if width == 0 || height == 0 {
            return Err(CatalogError::InvalidSize { key, width, height });
        }
        for (field, value) in [("volume", volume), ("power", power)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogError::InvalidResource { key, field, value });
            }
        }
        Ok(Self {
            key,
            name: name.into().trim().to_string(),
            volume,
            power,
            width,
            height,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Volume in m³.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Power draw in W.
    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Unrotated footprint.
    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// `(key, name, volume, power, width, height)` for [`Catalog::default_habitat`].
const STOCK_MODULES: &[(&str, &str, f64, f64, u32, u32)] = &[
    ("sleep", "Sleep Pod", 4.0, 5.0, 1, 1),
    ("galley", "Galley", 10.0, 40.0, 2, 1),
    ("life", "Life Support", 12.0, 50.0, 2, 1),
    ("medical", "Med Bay", 8.0, 20.0, 1, 1),
    ("gym", "Exercise", 12.0, 30.0, 1, 1),
    ("storage", "Cargo Room", 6.0, 2.0, 1, 1),
    ("cabin", "Crew Cabin", 10.0, 15.0, 2, 1),
    ("kitchen", "Kitchen", 12.0, 20.0, 2, 1),
    ("bedroom", "Bedroom", 8.0, 45.0, 2, 1),
    ("lab", "Research Area", 16.0, 35.0, 2, 1),
    ("greenhouse", "Hydroponics Module", 10.0, 45.0, 2, 1),
    ("wellness", "Wellness Space", 10.0, 15.0, 2, 1),
    ("command", "Control Room", 10.0, 35.0, 2, 1),
    ("airlock", "Entrance Module", 10.0, 25.0, 2, 1),
    ("solar", "Energy Module", 10.0, 15.0, 2, 1),
    ("recycling", "Green Disposal", 10.0, 25.0, 2, 1),
    ("observation", "Observatory", 10.0, 10.0, 2, 1),
];

/// Builder for an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    modules: Vec<Arc<ModuleType>>,
    key_to_index: HashMap<String, usize>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module type. Keys must be unique.
    pub fn register(&mut self, module: ModuleType) -> Result<&mut Self, CatalogError> {
        if self.key_to_index.contains_key(module.key()) {
            return Err(CatalogError::DuplicateKey(module.key().to_string()));
        }
        self.key_to_index
            .insert(module.key().to_string(), self.modules.len());
        self.modules.push(Arc::new(module));
        Ok(self)
    }

    /// Freeze the catalog.
    pub fn build(self) -> Catalog {
        Catalog {
            modules: self.modules,
            key_to_index: self.key_to_index,
        }
    }
}

/// A frozen set of module types, looked up by key. Iteration follows
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: Vec<Arc<ModuleType>>,
    key_to_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Build a catalog from a list of module types, rejecting duplicates.
    pub fn from_modules<I>(modules: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = ModuleType>,
    {
        let mut builder = CatalogBuilder::new();
        for module in modules {
            builder.register(module)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, key: &str) -> Option<&Arc<ModuleType>> {
        self.key_to_index.get(key).map(|&i| &self.modules[i])
    }

    /// Like [`Catalog::get`], but an unknown key is an error.
    pub fn require(&self, key: &str) -> Result<Arc<ModuleType>, CatalogError> {
        self.get(key)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_to_index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleType>> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The stock habitat module set: crew quarters, galley, life support,
    /// medical and the supporting facilities.
    ///
    /// Panics if the built-in table holds an invalid or repeated entry.
    pub fn default_habitat() -> Self {
        let mut builder = CatalogBuilder::new();
        for &(key, name, volume, power, width, height) in STOCK_MODULES {
            let registered = ModuleType::new(key, name, volume, power, width, height)
                .and_then(|module| builder.register(module).map(|_| ()));
            if let Err(e) = registered {
                panic!("stock module '{key}' is invalid: {e}");
            }
        }
        builder.build()
    }
}
