//! Shared parsing utilities for provider payloads.
//!
//! Date, number and coordinate parsing used by the normalizer across every
//! source definition.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use envwatch_place_models::GeoPoint;

/// Numeric timestamps above this are taken as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses a date or datetime string. Naive values are taken as UTC and
/// bare dates as midnight.
#[must_use]
pub fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Parses a Unix epoch value, in seconds or milliseconds.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value as i64)
    } else {
        DateTime::from_timestamp(value as i64, 0)
    }
}

/// Parses a JSON timestamp: a date string, an epoch number, or an epoch
/// number encoded as a string.
#[must_use]
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => {
            parse_datetime_str(s).or_else(|| s.trim().parse::<f64>().ok().and_then(parse_epoch))
        }
        serde_json::Value::Number(n) => n.as_f64().and_then(parse_epoch),
        _ => None,
    }
}

/// Parses a JSON number or numeric string. Accepts a decimal comma
/// (`"120,5"`) when the string has no dot.
#[must_use]
pub fn parse_number(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.contains(',') && !s.contains('.') {
                s.replace(',', ".").parse::<f64>().ok()?
            } else {
                s.parse::<f64>().ok()?
            }
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parses a lat/lng pair from JSON values. Returns `None` if either value
/// is unparseable or out of range.
#[must_use]
pub fn parse_lat_lng(lat: &serde_json::Value, lng: &serde_json::Value) -> Option<GeoPoint> {
    GeoPoint::new(parse_number(lat)?, parse_number(lng)?)
}
