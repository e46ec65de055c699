//! Serde data file structs for habitat content.
//!
//! These structs define the on-disk format for module catalogs and scoring
//! constraints. They are deserialized from RON, JSON, or TOML data files and
//! then validated into core types by the loader. Field names are snake_case;
//! the camelCase names used by exported editor files are accepted as aliases.

use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Modules
// ===========================================================================

/// A module type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleData {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(alias = "w", default = "default_size")]
    pub width: u32,
    #[serde(alias = "h", default = "default_size")]
    pub height: u32,
}

fn default_size() -> u32 {
    1
}

/// TOML wrapper: `[[modules]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlModules {
    pub modules: Vec<ModuleData>,
}

// ===========================================================================
// Constraints
// ===========================================================================

/// Scoring constraints in a data file. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConstraintsData {
    pub cols: u32,
    pub rows: u32,
    #[serde(alias = "maxVolume")]
    pub max_volume: f64,
    #[serde(alias = "maxPower")]
    pub max_power: f64,
    #[serde(alias = "moduleAffinities")]
    pub module_affinities: BTreeMap<String, AffinityData>,
    #[serde(alias = "airlockKey")]
    pub airlock_key: Option<String>,
    pub weights: WeightsData,
    /// Replaces the default anchor set when present.
    #[serde(alias = "anchorKeys")]
    pub anchor_keys: Option<Vec<String>>,
    /// Replaces the default crew set when present.
    #[serde(alias = "crewKeys")]
    pub crew_keys: Option<Vec<String>>,
}

impl Default for ConstraintsData {
    fn default() -> Self {
        Self {
            cols: 16,
            rows: 12,
            max_volume: 600.0,
            max_power: 300.0,
            module_affinities: BTreeMap::new(),
            airlock_key: None,
            weights: WeightsData::default(),
            anchor_keys: None,
            crew_keys: None,
        }
    }
}

/// Likes and hates of one module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AffinityData {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub hates: Vec<String>,
}

/// Criterion weights. Missing entries take the stock value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightsData {
    pub resource: f64,
    pub accessibility: f64,
    pub adjacency: f64,
    pub clustering: f64,
    pub safety: f64,
}

impl Default for WeightsData {
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
