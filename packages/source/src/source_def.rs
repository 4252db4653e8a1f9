//! Config-driven environmental data source definition.
//!
//! [`SourceDefinition`] captures everything unique about a provider in a
//! serializable config struct: where to send the request, which query
//! parameters to template, how the payload is nested and which fields map
//! onto a [`Record`](envwatch_source_models::Record). A single generic
//! fetcher and normalizer handle every source.

use std::collections::BTreeMap;

use envwatch_source_models::SourceKind;
use serde::Deserialize;

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven data source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"terrabrasilis_deter"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the source measures.
    pub kind: SourceKind,
    /// Endpoint URL. May contain `{partition}`.
    pub url: String,
    /// Human-readable portal page for the dataset.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// Dataset partitions tried in order (e.g., one per biome project).
    /// Empty means a single, unnamed partition.
    #[serde(default)]
    pub partitions: Vec<String>,
    /// Query parameter templates for place-scoped fetches.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Extra parameters for the global connectivity check, replacing any
    /// place-bound parameter of the same name.
    #[serde(default)]
    pub global_query: BTreeMap<String, String>,
    /// Static request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Access credential, if the provider needs one.
    #[serde(default)]
    pub credential: Option<CredentialConfig>,
    /// Restricts the fetch to direct network paths.
    #[serde(default)]
    pub direct_only: bool,
    /// Whether the query needs place coordinates (`{lat}`/`{lon}`).
    #[serde(default)]
    pub requires_coordinates: bool,
    /// How records are nested in the payload.
    pub shape: PayloadShape,
    /// Field mappings for normalization.
    #[serde(default)]
    pub fields: FieldMapping,
}

impl SourceDefinition {
    /// Whether any network path other than `direct` may be used.
    ///
    /// Credentialed sources never go through an intermediary.
    #[must_use]
    pub const fn allows_relays(&self) -> bool {
        !self.direct_only && self.credential.is_none()
    }

    /// Partitions to traverse. A source without partitions yields a single
    /// `None`.
    #[must_use]
    pub fn partition_hints(&self) -> Vec<Option<&str>> {
        if self.partitions.is_empty() {
            vec![None]
        } else {
            self.partitions.iter().map(|p| Some(p.as_str())).collect()
        }
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// A static access credential read from the environment.
///
/// Exactly one of `query_param` and `header` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    /// Environment variable holding the secret.
    pub env: String,
    /// Query parameter name carrying the secret.
    #[serde(default)]
    pub query_param: Option<String>,
    /// Header name carrying the secret.
    #[serde(default)]
    pub header: Option<String>,
}

// ── Payload shape ────────────────────────────────────────────────────────

/// How records are nested in a provider's JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadShape {
    /// The document is an array of entries.
    FlatList,
    /// The document is an object; entries are the array under `key`.
    Keyed {
        /// Top-level key holding the entry array (e.g., `"data"`).
        key: String,
    },
    /// `{ "<year>": { "<month>": <number> } }` monthly totals.
    YearMonth,
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps entry fields onto record fields.
///
/// Every field lists JSON pointer candidates (RFC 6901, e.g.
/// `"/components/pm2_5"`); the first present, non-null one wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldMapping {
    /// Timestamp candidates.
    #[serde(default)]
    pub timestamp: Vec<String>,
    /// Magnitude candidates.
    #[serde(default)]
    pub magnitude: Vec<String>,
    /// Fixed magnitude for every entry (e.g., `1.0` per hotspot). Takes
    /// precedence over [`Self::magnitude`].
    #[serde(default)]
    pub magnitude_constant: Option<f64>,
    /// Multiplier applied to parsed magnitudes (unit conversion).
    #[serde(default)]
    pub magnitude_scale: Option<f64>,
    /// Category candidates.
    #[serde(default)]
    pub category: Vec<String>,
    /// Raw category value → display label.
    #[serde(default)]
    pub category_labels: BTreeMap<String, String>,
    /// Latitude candidates.
    #[serde(default)]
    pub latitude: Vec<String>,
    /// Longitude candidates.
    #[serde(default)]
    pub longitude: Vec<String>,
    /// Secondary reading name → candidates. A missing or non-numeric
    /// reading is left out without skipping the entry.
    #[serde(default)]
    pub readings: BTreeMap<String, Vec<String>>,
}

impl FieldMapping {
    /// The raw category value behind a display label, or the label itself
    /// when no mapping produced it.
    #[must_use]
    pub fn raw_category<'a>(&'a self, label: &'a str) -> &'a str {
        self.category_labels
            .iter()
            .find(|(_, display)| display.as_str() == label)
            .map_or(label, |(raw, _)| raw.as_str())
    }
}

/// Parses a source definition from TOML.
///
/// # Errors
///
/// Returns [`toml::de::Error`] if the TOML is malformed or missing fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, toml::de::Error> {
    toml::de::from_str(toml_str)
}
