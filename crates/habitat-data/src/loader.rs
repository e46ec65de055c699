//! Loading pipeline: reads data files, validates them, builds core types.
//!
//! A habitat data directory holds up to three files, each in RON, JSON or
//! TOML (detected by extension, one format per base name):
//!
//! | Base name | Contents | Required |
//! |-----------|----------|----------|
//! | `modules` | module catalog (`[[modules]]` in TOML) | yes |
//! | `constraints` | grid, budgets, affinities, weights | no |
//! | `optimizer` | optimizer tuning | no |
//!
//! Layout documents are loaded from any of the three formats and saved as
//! JSON.

use crate::schema::{ConstraintsData, ModuleData};
use habitat_core::catalog::{Catalog, CatalogError, ModuleType};
use habitat_core::constraints::{Affinity, ConstraintError, Constraints, Weights};
use habitat_core::document::{DocumentError, LayoutDocument};
use habitat_core::layout::LayoutStore;
use habitat_core::optimizer::OptimizerConfig;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A module key reference does not name a catalog entry.
    #[error("unknown module '{key}' referenced in {file}")]
    UnknownModule { file: PathBuf, key: String },

    #[error("invalid module catalog in {file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error("invalid constraints in {file}: {source}")]
    Constraints {
        file: PathBuf,
        #[source]
        source: ConstraintError,
    },

    #[error("invalid layout in {file}: {source}")]
    Layout {
        file: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

fn parse_str<T: DeserializeOwned>(path: &Path, format: Format, content: &str) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(path, e)),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(path, format, &content)
}

/// Deserialize a list. TOML has no top-level arrays, so for TOML files the
/// array is taken from `toml_key` of the top-level table.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    if format != Format::Toml {
        return parse_str(path, format, &content);
    }

    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Load a module catalog from a list of [`ModuleData`].
pub fn load_catalog(path: &Path) -> Result<Catalog, DataLoadError> {
    let entries: Vec<ModuleData> = deserialize_list(path, "modules")?;
    let invalid = |source: CatalogError| DataLoadError::Catalog {
        file: path.to_path_buf(),
        source,
    };

    let mut builder = Catalog::builder();
    for entry in entries {
        let module = ModuleType::new(
            entry.key,
            entry.name,
            entry.volume,
            entry.power,
            entry.width,
            entry.height,
        )
        .map_err(invalid)?;
        builder.register(module).map_err(invalid)?;
    }
    let catalog = builder.build();
    log::info!("loaded {} module types from {}", catalog.len(), path.display());
    Ok(catalog)
}

// ===========================================================================
// Constraints
// ===========================================================================

/// Load scoring constraints.
///
/// With a catalog, every module key the file names (affinities, airlock,
/// anchor and crew lists) must exist in it.
pub fn load_constraints(path: &Path, catalog: Option<&Catalog>) -> Result<Constraints, DataLoadError> {
    let data: ConstraintsData = deserialize_file(path)?;
    if let Some(catalog) = catalog {
        check_module_refs(&data, catalog, path)?;
    }

    let mut builder = Constraints::builder()
        .grid(data.cols, data.rows)
        .max_volume(data.max_volume)
        .max_power(data.max_power)
        .airlock_key(data.airlock_key)
        .weights(Weights {
            resource: data.weights.resource,
            accessibility: data.weights.accessibility,
            adjacency: data.weights.adjacency,
            clustering: data.weights.clustering,
            safety: data.weights.safety,
        })
        .affinities(
            data.module_affinities
                .into_iter()
                .map(|(key, a)| (key, Affinity::new(a.likes, a.hates)))
                .collect(),
        );
    if let Some(keys) = data.anchor_keys {
        builder = builder.anchor_keys(keys);
    }
    if let Some(keys) = data.crew_keys {
        builder = builder.crew_keys(keys);
    }

    builder.build().map_err(|source| DataLoadError::Constraints {
        file: path.to_path_buf(),
        source,
    })
}

fn check_module_refs(data: &ConstraintsData, catalog: &Catalog, path: &Path) -> Result<(), DataLoadError> {
    let affinity_refs = data.module_affinities.iter().flat_map(|(key, a)| {
        std::iter::once(key).chain(a.likes.iter()).chain(a.hates.iter())
    });
    let refs = affinity_refs
        .chain(data.airlock_key.iter())
        .chain(data.anchor_keys.iter().flatten())
        .chain(data.crew_keys.iter().flatten());

    for key in refs {
        if !catalog.contains(key) {
            return Err(DataLoadError::UnknownModule {
                file: path.to_path_buf(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

// ===========================================================================
// Optimizer config
// ===========================================================================

/// Load optimizer tuning. Missing fields keep their defaults.
pub fn load_optimizer_config(path: &Path) -> Result<OptimizerConfig, DataLoadError> {
    deserialize_file(path)
}

// ===========================================================================
// Layouts
// ===========================================================================

/// Load and re-validate a layout document.
///
/// With a catalog, placements are bound to its module types by key instead
/// of the definitions embedded in the file.
pub fn load_layout(path: &Path, catalog: Option<&Catalog>) -> Result<LayoutStore, DataLoadError> {
    let doc: LayoutDocument = deserialize_file(path)?;
    let store = match catalog {
        Some(catalog) => doc.into_store_with_catalog(catalog),
        None => doc.into_store(),
    }
    .map_err(|source| DataLoadError::Layout {
        file: path.to_path_buf(),
        source,
    })?;
    log::info!("loaded layout with {} placements from {}", store.len(), path.display());
    Ok(store)
}

/// Write a layout document as pretty-printed JSON. `path` must end in
/// `.json`.
pub fn save_layout(path: &Path, store: &LayoutStore, cell_size: u32) -> Result<(), DataLoadError> {
    if detect_format(path)? != Format::Json {
        return Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        });
    }
    let json = LayoutDocument::from_store(store, cell_size)
        .to_json()
        .map_err(|source| DataLoadError::Layout {
            file: path.to_path_buf(),
            source,
        })?;
    std::fs::write(path, json)?;
    log::debug!("saved layout with {} placements to {}", store.len(), path.display());
    Ok(())
}

// ===========================================================================
// Directory loading
// ===========================================================================

/// Everything a habitat data directory describes.
#[derive(Debug, Clone)]
pub struct HabitatData {
    pub catalog: Catalog,
    pub constraints: Constraints,
    pub optimizer: OptimizerConfig,
}

/// Load `modules.*` (required), `constraints.*` and `optimizer.*` from a
/// directory. Absent optional files fall back to defaults.
pub fn load_habitat_data(dir: &Path) -> Result<HabitatData, DataLoadError> {
    let catalog = load_catalog(&require_data_file(dir, "modules")?)?;

    let constraints = match find_data_file(dir, "constraints")? {
        Some(path) => load_constraints(&path, Some(&catalog))?,
        None => {
            log::debug!("no constraints file in {}, using defaults", dir.display());
            Constraints::default()
        }
    };

    let optimizer = match find_data_file(dir, "optimizer")? {
        Some(path) => load_optimizer_config(&path)?,
        None => OptimizerConfig::default(),
    };

    Ok(HabitatData {
        catalog,
        constraints,
        optimizer,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
