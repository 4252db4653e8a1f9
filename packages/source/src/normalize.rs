//! Payload → [`Record`] normalization.
//!
//! Decoding happens in two steps. [`decode`] turns the provider-specific
//! nesting ([`PayloadShape`]) into a [`DecodedPayload`]; [`normalize`] then
//! maps each decoded entry through the source's [`FieldMapping`]. Raw
//! shape assumptions never leave this module.
//!
//! Entries that cannot be normalized are skipped one by one; a bad entry
//! never aborts the rest of the payload.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use envwatch_source_models::Record;

use crate::parsing::{parse_lat_lng, parse_number, parse_timestamp};
use crate::source_def::{FieldMapping, PayloadShape, SourceDefinition};

/// A payload after shape decoding.
#[derive(Debug)]
pub enum DecodedPayload<'a> {
    /// Entry objects, in provider order.
    Entries(&'a [serde_json::Value]),
    /// `(first day of month, value)` leaves, in provider order.
    Monthly(Vec<(NaiveDate, &'a serde_json::Value)>),
}

impl DecodedPayload<'_> {
    /// Number of candidate entries before field mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Entries(entries) => entries.len(),
            Self::Monthly(leaves) => leaves.len(),
        }
    }

    /// Whether there are no candidate entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes `payload` according to `shape`.
///
/// Returns `None` when the payload does not have the declared shape.
#[must_use]
pub fn decode<'a>(payload: &'a serde_json::Value, shape: &PayloadShape) -> Option<DecodedPayload<'a>> {
    match shape {
        PayloadShape::FlatList => payload
            .as_array()
            .map(|entries| DecodedPayload::Entries(entries.as_slice())),
        PayloadShape::Keyed { key } => payload
            .get(key)
            .and_then(serde_json::Value::as_array)
            .map(|entries| DecodedPayload::Entries(entries.as_slice())),
        PayloadShape::YearMonth => decode_year_month(payload).map(DecodedPayload::Monthly),
    }
}

fn decode_year_month(payload: &serde_json::Value) -> Option<Vec<(NaiveDate, &serde_json::Value)>> {
    let years = payload.as_object()?;
    let mut leaves = Vec::new();

    for (year, months) in years {
        let Ok(year) = year.trim().parse::<i32>() else {
            continue;
        };
        let Some(months) = months.as_object() else {
            continue;
        };
        for (month, value) in months {
            let Some(date) = month
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
            else {
                continue;
            };
            leaves.push((date, value));
        }
    }

    Some(leaves)
}

/// Normalizes a payload into records, preserving provider order.
#[must_use]
pub fn normalize(payload: &serde_json::Value, source: &SourceDefinition) -> Vec<Record> {
    let Some(decoded) = decode(payload, &source.shape) else {
        log::warn!(
            "{}: payload does not match the declared {:?} shape",
            source.id,
            source.shape
        );
        return Vec::new();
    };

    let candidates = decoded.len();
    let records: Vec<Record> = match decoded {
        DecodedPayload::Entries(entries) => entries
            .iter()
            .filter_map(|entry| normalize_entry(entry, &source.fields))
            .collect(),
        DecodedPayload::Monthly(leaves) => leaves
            .into_iter()
            .filter_map(|(date, value)| normalize_monthly(date, value, &source.fields))
            .collect(),
    };

    let skipped = candidates - records.len();
    if skipped > 0 {
        log::debug!(
            "{}: skipped {skipped} of {candidates} malformed entries",
            source.id
        );
    }

    records
}

/// Returns the first candidate pointer that resolves to a non-null value.
fn first_present<'a>(entry: &'a serde_json::Value, pointers: &[String]) -> Option<&'a serde_json::Value> {
    pointers
        .iter()
        .filter_map(|p| entry.pointer(p))
        .find(|v| !v.is_null())
}

fn scaled(magnitude: f64, fields: &FieldMapping) -> Option<f64> {
    let value = magnitude * fields.magnitude_scale.unwrap_or(1.0);
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn normalize_entry(entry: &serde_json::Value, fields: &FieldMapping) -> Option<Record> {
    let timestamp = parse_timestamp(first_present(entry, &fields.timestamp)?)?;

    let magnitude = match fields.magnitude_constant {
        Some(constant) => scaled(constant, fields)?,
        None => scaled(parse_number(first_present(entry, &fields.magnitude)?)?, fields)?,
    };

    let coordinates = match (
        first_present(entry, &fields.latitude),
        first_present(entry, &fields.longitude),
    ) {
        (None, None) => None,
        (Some(lat), Some(lng)) => Some(parse_lat_lng(lat, lng)?),
        // Half a coordinate pair is malformed, not absent.
        _ => return None,
    };

    let category = first_present(entry, &fields.category).and_then(|v| category_label(v, fields));

    let readings = fields
        .readings
        .iter()
        .filter_map(|(name, pointers)| {
            let value = parse_number(first_present(entry, pointers)?)?;
            Some((name.clone(), scaled(value, fields)?))
        })
        .collect();

    Some(Record {
        timestamp,
        magnitude,
        category,
        coordinates,
        readings,
    })
}

fn normalize_monthly(date: NaiveDate, value: &serde_json::Value, fields: &FieldMapping) -> Option<Record> {
    let timestamp: DateTime<Utc> = date.and_hms_opt(0, 0, 0)?.and_utc();
    let magnitude = scaled(parse_number(value)?, fields)?;
    Some(Record {
        timestamp,
        magnitude,
        category: None,
        coordinates: None,
        readings: BTreeMap::new(),
    })
}

fn category_label(value: &serde_json::Value, fields: &FieldMapping) -> Option<String> {
    let raw = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Some(fields.category_labels.get(&raw).cloned().unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::find_source;
    use crate::source_def::parse_source_toml;

    fn gfw() -> SourceDefinition {
        find_source("gfw_integrated_alerts").unwrap()
    }

    #[test]
    fn normalizes_data_keyed_alerts() {
        let payload = json!({"data": [
            {"area_ha": 120.5, "state": "PA", "published_at": "2024-03-01"},
            {"area_ha": 30.0, "state": "PA", "published_at": "2024-04-01"}
        ]});
        let records = normalize(&payload, &gfw());
        assert_eq!(records.len(), 2);
        assert!((records[0].magnitude - 120.5).abs() < f64::EPSILON);
        assert_eq!(records[0].category.as_deref(), Some("PA"));
        assert_eq!(records[1].timestamp.to_string(), "2024-04-01 00:00:00 UTC");
        assert!(records[0].coordinates.is_none());
    }

    #[test]
    fn skips_malformed_entries_individually() {
        let payload = json!({"data": [
            {"area_ha": 10.0, "published_at": "2024-03-01"},
            {"area_ha": 11.0},
            {"area_ha": -4.0, "published_at": "2024-03-02"},
            {"area_ha": "n/a", "published_at": "2024-03-03"},
            {"area_ha": 12.0, "published_at": "2024-03-04", "latitude": "x", "longitude": -52.0},
            {"area_ha": 13.0, "published_at": "2024-03-05", "latitude": -3.2},
            {"area_ha": 14.0, "published_at": "2024-03-06", "latitude": -3.2, "longitude": -52.2}
        ]});
        let records = normalize(&payload, &gfw());
        let magnitudes: Vec<f64> = records.iter().map(|r| r.magnitude).collect();
        assert_eq!(magnitudes, vec![10.0, 14.0]);
        assert!(records[1].coordinates.is_some());
    }

    #[test]
    fn missing_category_is_left_unset() {
        let payload = json!({"data": [{"area_ha": 1.0, "published_at": "2024-03-01", "state": ""}]});
        let records = normalize(&payload, &gfw());
        assert_eq!(records[0].category, None);
    }

    #[test]
    fn labels_air_quality_index() {
        let source = find_source("openweather_air").unwrap();
        let payload = json!({
            "coord": {"lon": -52.2064, "lat": -3.2033},
            "list": [{
                "dt": 1_709_251_200,
                "main": {"aqi": 4},
                "components": {"co": 300.0, "no2": 10.0, "pm2_5": 102.0}
            }]
        });
        let records = normalize(&payload, &source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category.as_deref(), Some("Poor"));
        assert!((records[0].magnitude - 102.0).abs() < f64::EPSILON);
        assert_eq!(records[0].readings.get("co"), Some(&300.0));
    }

    #[test]
    fn missing_reading_keeps_the_entry() {
        let source = find_source("openweather_air").unwrap();
        let payload = json!({"list": [{
            "dt": 1_709_251_200,
            "main": {"aqi": 1},
            "components": {"pm2_5": 4.0, "co": "n/a"}
        }]});
        let records = normalize(&payload, &source);
        assert_eq!(records.len(), 1);
        assert!(records[0].readings.is_empty());
    }

    #[test]
    fn hotspots_count_one_each() {
        let source = find_source("inpe_queimadas").unwrap();
        let payload = json!([
            {"data_hora_gmt": "2024-08-10 17:20:00", "latitude": -7.1, "longitude": -64.5, "satelite": "AQUA_M-T"},
            {"properties": {"data_hora_gmt": "2024-08-11 04:10:00", "latitude": -7.2, "longitude": -64.6}}
        ]);
        let records = normalize(&payload, &source);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| (r.magnitude - 1.0).abs() < f64::EPSILON));
        assert!(records.iter().all(|r| r.coordinates.is_some()));
        assert_eq!(records[1].category, None);
    }

    #[test]
    fn deter_features_are_scaled_to_hectares() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let payload = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"view_date": "2024-05-02", "areamunkm": 0.35, "classname": "DESMATAMENTO_CR"}
            }]
        });
        let records = normalize(&payload, &source);
        assert_eq!(records.len(), 1);
        assert!((records[0].magnitude - 35.0).abs() < 1e-9);
        assert_eq!(records[0].category.as_deref(), Some("DESMATAMENTO_CR"));
    }

    #[test]
    fn flattens_year_month_nesting() {
        let source = find_source("terrabrasilis_prodes").unwrap();
        let payload = json!({
            "2023": {"11": 1.25, "12": "0,5", "13": 9.0},
            "bad": {"1": 1.0},
            "2024": {"1": 2.0, "2": null}
        });
        let records = normalize(&payload, &source);
        let summary: Vec<(String, f64)> = records
            .iter()
            .map(|r| (r.timestamp.format("%Y-%m").to_string(), r.magnitude))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("2023-11".to_string(), 125.0),
                ("2023-12".to_string(), 50.0),
                ("2024-01".to_string(), 200.0),
            ]
        );
    }

    #[test]
    fn shape_mismatch_yields_nothing() {
        let payload = json!([{"area_ha": 1.0, "published_at": "2024-03-01"}]);
        assert!(normalize(&payload, &gfw()).is_empty());
        assert!(decode(&payload, &gfw().shape).is_none());
    }

    #[test]
    fn empty_and_mismatched_payloads_decode_differently() {
        let source = parse_source_toml(
            r#"
            id = "demo"
            name = "Demo"
            kind = "fire_hotspot"
            url = "https://example.org"

            [shape]
            type = "keyed"
            key = "list"
            "#,
        )
        .unwrap();
        let two = json!({"list": [{}, {}]});
        let none = json!({"list": []});
        assert_eq!(decode(&two, &source.shape).map(|d| d.len()), Some(2));
        assert!(decode(&none, &source.shape).is_some_and(|d| d.is_empty()));
        assert!(decode(&json!({"other": [1]}), &source.shape).is_none());
    }
}
