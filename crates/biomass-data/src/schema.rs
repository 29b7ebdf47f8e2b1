//! Serde data file structs for generator definitions.
//!
//! These structs define the on-disk format for materials and generators.
//! They are deserialized from RON, JSON, or TOML data files and then
//! resolved into engine types by the loader.

use serde::Deserialize;

// ===========================================================================
// Materials
// ===========================================================================

/// Name of the material generators emit when a definition names none.
pub const DEFAULT_MATERIAL: &str = "Biomass";

// Materials are a plain list of names; a material's position in the list is
// its `ResourceKind`.

// ===========================================================================
// Generators
// ===========================================================================

/// A generator definition in a data file. Omitted rates fall back to the
/// engine defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    pub name: String,
    #[serde(default)]
    pub base_insertion_delay: Option<f64>,
    #[serde(default)]
    pub yield_per_unit_mass: Option<f64>,
    #[serde(default)]
    pub produce_yield_multiplier: Option<f64>,
    #[serde(default)]
    pub processing_time_per_unit_mass: Option<f64>,
    #[serde(default = "default_material")]
    pub required_material: String,
}

fn default_material() -> String {
    DEFAULT_MATERIAL.to_string()
}
