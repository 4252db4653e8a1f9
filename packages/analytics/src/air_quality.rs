//! Air-quality index classification.
//!
//! Providers report a 1–5 index (1 = good, 5 = very poor). Levels 4 and 5
//! raise a health alert, level 3 warns sensitive groups. Display labels
//! for the index belong to the source definition, not to this module.

use envwatch_analytics_models::{AdvisoryLevel, AirQualityClass};

/// PM2.5 concentration (µg/m³) treated as the top of the danger scale.
const PM25_DANGER_CEILING: f64 = 150.0;

/// Classifies a 1–5 air-quality index.
#[must_use]
pub fn classify_air_quality(index: u8) -> AirQualityClass {
    let advisory = match index {
        1 | 2 => AdvisoryLevel::Clear,
        3 => AdvisoryLevel::SensitiveGroups,
        4 | 5 => AdvisoryLevel::Alert,
        _ => AdvisoryLevel::Unknown,
    };

    AirQualityClass { index, advisory }
}

/// PM2.5 concentration as a fraction of the danger ceiling, clamped to
/// `0.0..=1.0`.
#[must_use]
pub fn pm25_danger_ratio(pm25: f64) -> f64 {
    if pm25.is_finite() {
        (pm25 / PM25_DANGER_CEILING).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_indices() {
        let good = classify_air_quality(1);
        assert_eq!(good.index, 1);
        assert_eq!(good.advisory, AdvisoryLevel::Clear);
        assert_eq!(classify_air_quality(2).advisory, AdvisoryLevel::Clear);

        assert_eq!(
            classify_air_quality(3).advisory,
            AdvisoryLevel::SensitiveGroups
        );

        assert_eq!(classify_air_quality(4).advisory, AdvisoryLevel::Alert);
        assert_eq!(classify_air_quality(5).advisory, AdvisoryLevel::Alert);
    }

    #[test]
    fn out_of_scale_index_is_unknown() {
        for index in [0, 6, 255] {
            assert_eq!(classify_air_quality(index).advisory, AdvisoryLevel::Unknown);
        }
    }

    #[test]
    fn danger_ratio_is_clamped() {
        assert!((pm25_danger_ratio(75.0) - 0.5).abs() < f64::EPSILON);
        assert!((pm25_danger_ratio(400.0) - 1.0).abs() < f64::EPSILON);
        assert!(pm25_danger_ratio(-3.0).abs() < f64::EPSILON);
        assert!(pm25_danger_ratio(f64::NAN).abs() < f64::EPSILON);
    }
}
