#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation parameters and result types.
//!
//! [`SummaryResult`] is what the aggregator hands back for a batch of
//! normalized records; [`AirQualityClass`] is the human-facing reading of
//! an air-quality index.

use envwatch_source_models::Record;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Group key assigned to records whose group field is missing.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Field used to bucket records.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GroupBy {
    /// Record category (alert class, state, satellite, AQI label).
    #[default]
    Category,
    /// Calendar year, rendered `YYYY`.
    Year,
    /// Calendar month, rendered `YYYY-MM`.
    Month,
    /// Calendar day, rendered `YYYY-MM-DD`.
    Day,
}

/// Summed magnitude for one group key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotal {
    /// Group key.
    pub key: String,
    /// Sum of magnitudes in the group.
    pub magnitude: f64,
}

/// Aggregate view over a sequence of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// Number of records.
    pub total_count: usize,
    /// Sum of all magnitudes.
    pub total_magnitude: f64,
    /// Per-key totals in first-encountered key order.
    pub grouped_totals: Vec<GroupTotal>,
    /// Largest groups first; ties keep encounter order.
    pub top_n: Vec<GroupTotal>,
    /// First record carrying the latest timestamp.
    pub most_recent: Option<Record>,
}

/// How worried a reader should be about an air-quality reading.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdvisoryLevel {
    /// The air is clean.
    Clear,
    /// Children, the elderly and people with respiratory conditions may be
    /// affected.
    SensitiveGroups,
    /// High smoke concentration, likely nearby fires or transported smoke.
    Alert,
    /// The index is outside the known scale.
    Unknown,
}

impl AdvisoryLevel {
    /// One-sentence advisory for display.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Clear => "The air is clean right now.",
            Self::SensitiveGroups => {
                "Sensitive groups (children and the elderly) may experience respiratory effects."
            }
            Self::Alert => {
                "Health alert: smoke concentration is high. This points to nearby fires or smoke carried through the atmosphere."
            }
            Self::Unknown => "The reported index is outside the known 1-5 scale.",
        }
    }
}

/// Classification of a 1–5 air-quality index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityClass {
    /// The index as reported.
    pub index: u8,
    /// Advisory level.
    pub advisory: AdvisoryLevel,
}
