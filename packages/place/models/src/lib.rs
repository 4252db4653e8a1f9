#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place types shared by the resolver, the fetcher and the pipeline.
//!
//! A [`Place`] is produced once per lookup from free-text input and never
//! mutated afterwards; filling in missing coordinates produces a new value.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, returning `None` when either component is not
    /// finite or out of range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Where a place's coordinates came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinateSource {
    /// Shipped with the built-in table of known places.
    BuiltIn,
    /// Looked up through the geocoding service.
    Geocoded,
    /// The configured regional default, used when geocoding failed.
    RegionalDefault,
}

/// A resolved geographic entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// The text the user typed, trimmed.
    pub query_text: String,
    /// Stable identifier (IBGE municipality code for Brazilian places).
    pub resolved_id: String,
    /// Display name, e.g. `"Altamira (PA)"`.
    pub canonical_name: String,
    /// Coordinates, when known.
    pub coordinates: Option<GeoPoint>,
    /// Provenance of [`Self::coordinates`].
    pub coordinate_source: Option<CoordinateSource>,
}

impl Place {
    /// Latitude, if coordinates are known.
    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|p| p.latitude)
    }

    /// Longitude, if coordinates are known.
    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|p| p.longitude)
    }

    /// Returns a copy of this place with the given coordinates attached.
    #[must_use]
    pub fn with_coordinates(&self, point: GeoPoint, source: CoordinateSource) -> Self {
        Self {
            coordinates: Some(point),
            coordinate_source: Some(source),
            ..self.clone()
        }
    }
}

/// One row of the remote place directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Directory identifier, stringified.
    pub id: String,
    /// Place name as published by the directory.
    pub name: String,
    /// State/region abbreviation, when the directory exposes one.
    pub region: Option<String>,
}

impl DirectoryEntry {
    /// Display name: `"Name (REGION)"` or just the name.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        match &self.region {
            Some(region) => format!("{} ({region})", self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_points() {
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(-3.2033, -52.2064).is_some());
    }

    #[test]
    fn canonical_name_includes_region() {
        let entry = DirectoryEntry {
            id: "1500602".to_string(),
            name: "Altamira".to_string(),
            region: Some("PA".to_string()),
        };
        assert_eq!(entry.canonical_name(), "Altamira (PA)");

        let bare = DirectoryEntry {
            region: None,
            ..entry
        };
        assert_eq!(bare.canonical_name(), "Altamira");
    }

    #[test]
    fn with_coordinates_keeps_identity() {
        let place = Place {
            query_text: "labrea".to_string(),
            resolved_id: "1302405".to_string(),
            canonical_name: "Lábrea (AM)".to_string(),
            coordinates: None,
            coordinate_source: None,
        };
        let point = GeoPoint::new(-7.259, -64.7981).unwrap();
        let located = place.with_coordinates(point, CoordinateSource::Geocoded);
        assert_eq!(located.resolved_id, place.resolved_id);
        assert_eq!(located.latitude(), Some(-7.259));
        assert_eq!(located.coordinate_source, Some(CoordinateSource::Geocoded));
    }

    #[test]
    fn coordinate_source_serializes_snake_case() {
        let json = serde_json::to_string(&CoordinateSource::RegionalDefault).unwrap();
        assert_eq!(json, "\"regional_default\"");
        assert_eq!(CoordinateSource::BuiltIn.to_string(), "built_in");
    }
}
