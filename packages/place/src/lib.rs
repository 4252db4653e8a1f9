#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place name resolution.
//!
//! Maps free text to a [`Place`] in up to three steps:
//!
//! 1. **Built-in table** ([`known`]): high-priority municipalities with
//!    identifiers and coordinates, no network.
//! 2. **Remote directory**: the full municipality listing, scanned for an
//!    exact accent- and case-insensitive name match.
//! 3. **Geocoder**: only through [`LocationResolver::ensure_coordinates`],
//!    when a data source needs coordinates the place lacks. Falls back to a
//!    fixed regional default instead of failing.

pub mod config;
pub mod directory;
pub mod known;
pub mod normalize;

use envwatch_place_models::{CoordinateSource, DirectoryEntry, Place};
use thiserror::Error;

use crate::config::ResolverConfig;
use crate::directory::{HttpPlaceDirectory, PlaceDirectory};
use crate::normalize::match_key;

pub use envwatch_place_models as models;

/// Errors from place resolution.
#[derive(Debug, Error)]
pub enum PlaceError {
    /// Nothing matched the query, or the directory could not be listed.
    #[error("No place matches '{query}'")]
    NotFound {
        /// The trimmed query text.
        query: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Resolves free-text place names.
pub struct LocationResolver<D = HttpPlaceDirectory> {
    directory: D,
    config: ResolverConfig,
}

impl LocationResolver<HttpPlaceDirectory> {
    /// Builds a resolver that talks to the services in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: ResolverConfig) -> Result<Self, PlaceError> {
        let directory = HttpPlaceDirectory::new(config.clone())?;
        Ok(Self::new(directory, config))
    }
}

impl<D: PlaceDirectory> LocationResolver<D> {
    /// Builds a resolver over an arbitrary [`PlaceDirectory`].
    #[must_use]
    pub const fn new(directory: D, config: ResolverConfig) -> Self {
        Self { directory, config }
    }

    /// The underlying directory.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolves `query_text` to a [`Place`].
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::NotFound`] when the text is empty, nothing
    /// matches, or the directory is unreachable. No other variant is
    /// returned.
    pub async fn resolve(&self, query_text: &str) -> Result<Place, PlaceError> {
        let query_text = query_text.trim();
        let key = match_key(query_text);
        let not_found = || PlaceError::NotFound {
            query: query_text.to_string(),
        };

        if key.is_empty() {
            return Err(not_found());
        }

        if let Some(known) = known::lookup(&key) {
            log::debug!("Resolved '{query_text}' from built-in table: {}", known.id);
            return Ok(known.to_place(query_text));
        }

        let entries = match self.directory.list_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Place directory unavailable while resolving '{query_text}': {e}");
                return Err(not_found());
            }
        };

        let Some(entry) = find_entry(&entries, &key) else {
            log::info!("No directory entry matches '{query_text}'");
            return Err(not_found());
        };

        log::debug!("Resolved '{query_text}' from directory: {}", entry.id);
        Ok(Place {
            query_text: query_text.to_string(),
            resolved_id: entry.id.clone(),
            canonical_name: entry.canonical_name(),
            coordinates: None,
            coordinate_source: None,
        })
    }

    /// Returns `place` with coordinates attached.
    ///
    /// Places that already carry coordinates are returned unchanged. Others
    /// are geocoded by canonical name; any geocoder failure or empty answer
    /// yields the configured regional default.
    pub async fn ensure_coordinates(&self, place: Place) -> Place {
        if place.coordinates.is_some() {
            return place;
        }

        match self.directory.geocode(&place.canonical_name).await {
            Ok(Some(point)) => {
                log::debug!(
                    "Geocoded '{}' to ({}, {})",
                    place.canonical_name,
                    point.latitude,
                    point.longitude
                );
                place.with_coordinates(point, CoordinateSource::Geocoded)
            }
            Ok(None) => {
                log::warn!(
                    "Geocoder has no match for '{}', using regional default",
                    place.canonical_name
                );
                place.with_coordinates(
                    self.config.default_point(),
                    CoordinateSource::RegionalDefault,
                )
            }
            Err(e) => {
                log::warn!(
                    "Geocoding '{}' failed ({e}), using regional default",
                    place.canonical_name
                );
                place.with_coordinates(
                    self.config.default_point(),
                    CoordinateSource::RegionalDefault,
                )
            }
        }
    }
}

/// Linear scan for the first entry whose name normalizes to `key`.
#[must_use]
pub fn find_entry<'a>(entries: &'a [DirectoryEntry], key: &str) -> Option<&'a DirectoryEntry> {
    entries.iter().find(|entry| match_key(&entry.name) == key)
}
