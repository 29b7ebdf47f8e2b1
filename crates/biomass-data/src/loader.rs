//! Resolution pipeline: reads data files, resolves material names, validates
//! generator configs.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_generator_data`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use biomass_core::device::{BIOMASS, ConfigError, GeneratorConfig};
use biomass_core::fixed::{Fixed64, checked_f64_to_fixed64};
use biomass_core::id::ResourceKind;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::schema::{DEFAULT_MATERIAL, GeneratorData};

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

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A generator definition failed validation.
    #[error("invalid generator '{name}' in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        name: String,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
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

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
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

/// Deserialize a list from a file. For TOML files, extracts the array at
/// `toml_key` from the top-level table; RON and JSON hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .cloned()
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Fail with `DuplicateName` if `name` is already in `map`.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    pub materials: HashMap<String, ResourceKind>,
    pub generators: HashMap<String, GeneratorConfig>,
}

impl GameData {
    pub fn generator(&self, name: &str) -> Option<&GeneratorConfig> {
        self.generators.get(name)
    }

    pub fn material(&self, name: &str) -> Option<ResourceKind> {
        self.materials.get(name).copied()
    }
}

/// Load `materials` (optional) and `generators` (required) from `dir`.
///
/// Without a materials file the only material is `"Biomass"` at kind 0.
pub fn load_generator_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let materials = match find_data_file(dir, "materials")? {
        Some(path) => load_materials(&path)?,
        None => HashMap::from([(DEFAULT_MATERIAL.to_string(), BIOMASS)]),
    };

    let path = require_data_file(dir, "generators")?;
    let entries: Vec<GeneratorData> = deserialize_list(&path, "generators")?;

    let mut generators = HashMap::with_capacity(entries.len());
    for entry in entries {
        check_duplicate(&generators, &entry.name, &path)?;
        let config = resolve_generator(&entry, &materials, &path)?;
        generators.insert(entry.name, config);
    }

    debug!(
        dir = %dir.display(),
        materials = materials.len(),
        generators = generators.len(),
        "generator data loaded"
    );
    Ok(GameData {
        materials,
        generators,
    })
}

fn load_materials(path: &Path) -> Result<HashMap<String, ResourceKind>, DataLoadError> {
    let names: Vec<String> = deserialize_list(path, "materials")?;
    let mut materials = HashMap::with_capacity(names.len());
    for (index, name) in names.into_iter().enumerate() {
        check_duplicate(&materials, &name, path)?;
        let kind = u32::try_from(index)
            .map(ResourceKind)
            .map_err(|e| parse_error(path, e))?;
        materials.insert(name, kind);
    }
    Ok(materials)
}

fn resolve_generator(
    entry: &GeneratorData,
    materials: &HashMap<String, ResourceKind>,
    file: &Path,
) -> Result<GeneratorConfig, DataLoadError> {
    let invalid = |source: ConfigError| DataLoadError::InvalidConfig {
        file: file.to_path_buf(),
        name: entry.name.clone(),
        source,
    };
    let defaults = GeneratorConfig::default();
    let rate = |field: &'static str, value: Option<f64>, fallback: Fixed64| match value {
        None => Ok(fallback),
        Some(value) => checked_f64_to_fixed64(value)
            .ok_or_else(|| invalid(ConfigError::OutOfRange { field, value })),
    };

    let config = GeneratorConfig {
        base_insertion_delay: rate(
            "base_insertion_delay",
            entry.base_insertion_delay,
            defaults.base_insertion_delay,
        )?,
        yield_per_unit_mass: rate(
            "yield_per_unit_mass",
            entry.yield_per_unit_mass,
            defaults.yield_per_unit_mass,
        )?,
        produce_yield_multiplier: rate(
            "produce_yield_multiplier",
            entry.produce_yield_multiplier,
            defaults.produce_yield_multiplier,
        )?,
        processing_time_per_unit_mass: rate(
            "processing_time_per_unit_mass",
            entry.processing_time_per_unit_mass,
            defaults.processing_time_per_unit_mass,
        )?,
        required_material: *resolve_name(materials, &entry.required_material, file, "material")?,
    };

    config.validate().map_err(invalid)?;
    Ok(config)
}
