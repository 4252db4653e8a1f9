#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source query types and the canonical normalized record format.
//!
//! Every environmental data provider (air quality, deforestation alerts,
//! fire hotspots) produces [`Record`]s after normalization, regardless of
//! how its payload was nested.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use envwatch_place_models::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What a data source measures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Particulate/gas concentrations (magnitude in µg/m³).
    AirQuality,
    /// Deforestation alerts (magnitude in hectares).
    DeforestationAlert,
    /// Deforestation increments aggregated per month (hectares).
    DeforestationIncrement,
    /// Satellite fire hotspots (magnitude is a count).
    FireHotspot,
}

impl SourceKind {
    /// Unit label for magnitudes of this kind.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::AirQuality => "µg/m³",
            Self::DeforestationAlert | Self::DeforestationIncrement => "ha",
            Self::FireHotspot => "hotspots",
        }
    }
}

/// An inclusive calendar date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` calendar days ending on and including `end`. A window
    /// is at least one day long.
    #[must_use]
    pub fn lookback(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// The `days`-long window ending today (UTC).
    #[must_use]
    pub fn lookback_from_today(days: u32) -> Self {
        Self::lookback(Utc::now().date_naive(), days)
    }
}

/// One fetch attempt's query. Built per attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuery {
    /// Resolved place identifier. `None` for the global connectivity check.
    pub place_id: Option<String>,
    /// Source identifier (e.g., `"terrabrasilis_deter"`).
    pub source_name: String,
    /// Dataset partition (e.g., `"deter-amz"`), if the source has any.
    pub partition_hint: Option<String>,
    /// Date filter, if any.
    pub date_range: Option<DateRange>,
}

/// Which attempt produced a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// Source identifier.
    pub source_id: String,
    /// What the source measures.
    pub kind: SourceKind,
    /// Partition that answered, if the source is partitioned.
    pub partition: Option<String>,
    /// Network path that answered (e.g., `"direct"`).
    pub path_id: String,
    /// Attempts made in total, including the successful one.
    pub attempts: usize,
}

/// One normalized observation.
///
/// `magnitude` is finite and non-negative. `coordinates`, when present,
/// are within WGS84 bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// When the observation was made or published.
    pub timestamp: DateTime<Utc>,
    /// Area, concentration or count, depending on [`SourceKind`].
    pub magnitude: f64,
    /// Region, state or classification label.
    pub category: Option<String>,
    /// Location of the observation, if the source provides one.
    pub coordinates: Option<GeoPoint>,
    /// Secondary readings by name (e.g., `"co"`), in the same unit as
    /// `magnitude`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub readings: BTreeMap<String, f64>,
}
