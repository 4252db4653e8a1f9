//! Source registry: loads all source definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new source is as simple as
//! creating a new TOML file and adding it to the list below.

use crate::SourceError;
use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    // ── Air quality ──────────────────────────────────────────────────
    (
        "openweather_air",
        include_str!("../sources/openweather_air.toml"),
    ),
    // ── Deforestation ────────────────────────────────────────────────
    (
        "terrabrasilis_deter",
        include_str!("../sources/terrabrasilis_deter.toml"),
    ),
    (
        "gfw_integrated_alerts",
        include_str!("../sources/gfw_integrated_alerts.toml"),
    ),
    (
        "terrabrasilis_prodes",
        include_str!("../sources/terrabrasilis_prodes.toml"),
    ),
    // ── Fire hotspots ────────────────────────────────────────────────
    (
        "inpe_queimadas",
        include_str!("../sources/inpe_queimadas.toml"),
    ),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 5;

/// Source used when the caller does not pick one.
pub const DEFAULT_SOURCE_ID: &str = "terrabrasilis_deter";

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a source definition by id.
///
/// # Errors
///
/// Returns [`SourceError::UnknownSource`] if no source has this id.
pub fn find_source(id: &str) -> Result<SourceDefinition, SourceError> {
    all_sources()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| SourceError::UnknownSource { id: id.to_string() })
}
