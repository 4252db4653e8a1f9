//! Resolver service configuration, embedded at compile time from
//! `config/resolver.toml`.

use std::time::Duration;

use envwatch_place_models::GeoPoint;
use serde::Deserialize;

const RESOLVER_TOML: &str = include_str!("../config/resolver.toml");

/// Top-level resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent to the directory and geocoder.
    pub user_agent: String,
    /// Remote place directory.
    pub directory: DirectoryConfig,
    /// Free-text geocoder.
    pub geocoder: GeocoderConfig,
    /// Coordinate used when geocoding fails.
    pub default_coordinate: DefaultCoordinate,
}

/// Where to list places and how to read each entry.
///
/// Field locations are JSON pointers (RFC 6901) into each array element.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Listing URL returning a JSON array.
    pub url: String,
    /// Pointer to the identifier (string or number).
    pub id_pointer: String,
    /// Pointer to the place name.
    pub name_pointer: String,
    /// Pointer to the region abbreviation, if the directory has one.
    #[serde(default)]
    pub region_pointer: Option<String>,
}

/// Nominatim-compatible search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    /// Search URL (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub url: String,
    /// ISO country code used to restrict matches.
    pub country_code: String,
}

/// Raw default coordinate as written in TOML.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DefaultCoordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl ResolverConfig {
    /// Returns the embedded configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the config is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(RESOLVER_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse resolver.toml: {e}"))
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The regional default as a validated point.
    ///
    /// Falls back to the origin if the configured value is out of range.
    #[must_use]
    pub fn default_point(&self) -> GeoPoint {
        GeoPoint::new(
            self.default_coordinate.latitude,
            self.default_coordinate.longitude,
        )
        .unwrap_or(GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedded_config() {
        let config = ResolverConfig::embedded();
        assert!(!config.directory.url.is_empty());
        assert!(!config.geocoder.url.is_empty());
        assert!(config.timeout_secs > 0 && config.timeout_secs < 10);
    }

    #[test]
    fn default_point_is_in_the_amazon() {
        let point = ResolverConfig::embedded().default_point();
        assert!(point.latitude < 0.0 && point.latitude > -10.0);
        assert!(point.longitude < -50.0 && point.longitude > -70.0);
    }
}
