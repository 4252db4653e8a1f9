#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Environmental data sources: definitions, fetching and normalization.
//!
//! Every provider is described by a TOML [`SourceDefinition`] embedded at
//! compile time. A single generic [`SourceFetcher`] walks the definition's
//! partitions across the configured network paths, and
//! [`normalize::normalize`] maps the first non-empty payload onto
//! [`Record`](envwatch_source_models::Record)s.

pub mod credentials;
pub mod fetcher;
pub mod http;
pub mod normalize;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod settings;
pub mod source_def;
pub mod template;

pub use credentials::Credentials;
pub use envwatch_source_models as models;
pub use fetcher::{Attempt, FetchOutcome, SourceFetcher};
pub use settings::{FetcherSettings, NetworkPath};
pub use source_def::SourceDefinition;

use envwatch_place_models::{GeoPoint, Place};
use envwatch_source_models::DateRange;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with a non-success status.
    #[error("HTTP {status} from {label}")]
    Status {
        /// Response status code.
        status: u16,
        /// Log-safe attempt description.
        label: String,
    },

    /// Something the fetch needs is not configured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of what is missing.
        message: String,
    },

    /// A URL or parameter template could not be expanded.
    #[error("Template error: {message}")]
    Template {
        /// Description of what went wrong.
        message: String,
    },

    /// No source definition has the requested ID.
    #[error("Unknown source: {id}")]
    UnknownSource {
        /// The requested ID.
        id: String,
    },
}

impl SourceError {
    /// Whether the error was detected before any request was sent.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Template { .. } | Self::UnknownSource { .. }
        )
    }
}

/// Filters applied to a fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Only fetch records within this range.
    pub date_range: Option<DateRange>,
    /// Maximum number of records to request from the provider.
    pub limit: Option<u64>,
}

/// Whose data to fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchTarget {
    /// Resolved place identifier; `None` for the global connectivity check.
    pub place_id: Option<String>,
    /// Place coordinates, for sources that query by position.
    pub coordinates: Option<GeoPoint>,
}

impl FetchTarget {
    /// Targets a resolved place.
    #[must_use]
    pub fn for_place(place: &Place) -> Self {
        Self {
            place_id: Some(place.resolved_id.clone()),
            coordinates: place.coordinates,
        }
    }

    /// Targets no place in particular.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }
}
