//! Habitat Data -- file loading for habitat catalogs, constraints and layouts.
//!
//! All file I/O of the habitat engine lives here; `habitat-core` never
//! touches the filesystem. Data files may be written in RON, JSON or TOML.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, HabitatData, load_habitat_data, load_layout, save_layout};
