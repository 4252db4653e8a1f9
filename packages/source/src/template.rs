//! `{placeholder}` expansion for source URLs and query parameters.
//!
//! Placeholders fall in three groups:
//!
//! - **place-bound** (`place_id`, `lat`, `lon`): required for place-scoped
//!   fetches, dropped together with their parameter for the global check.
//! - **optional filters** (`start`, `end`, `limit`): the whole parameter is
//!   dropped when the value is not set.
//! - **partition**: required whenever it appears.

use std::sync::LazyLock;

use envwatch_place_models::GeoPoint;
use envwatch_source_models::DateRange;
use regex::Regex;

use crate::SourceError;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

const PLACE_BOUND: &[&str] = &["place_id", "lat", "lon"];
const OPTIONAL: &[&str] = &["start", "end", "limit"];
const REQUIRED: &[&str] = &["partition"];

/// Values available to one attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    /// Resolved place identifier.
    pub place_id: Option<&'a str>,
    /// Place coordinates.
    pub coordinates: Option<GeoPoint>,
    /// Partition being attempted.
    pub partition: Option<&'a str>,
    /// Date filter.
    pub date_range: Option<DateRange>,
    /// Result limit.
    pub limit: Option<u64>,
    /// Global connectivity check (no place filter).
    pub global: bool,
}

impl TemplateContext<'_> {
    fn value(&self, name: &str) -> Option<String> {
        match name {
            "place_id" => self.place_id.map(String::from),
            "lat" => self.coordinates.map(|p| p.latitude.to_string()),
            "lon" => self.coordinates.map(|p| p.longitude.to_string()),
            "partition" => self.partition.map(String::from),
            "start" => self
                .date_range
                .map(|r| r.start.format("%Y-%m-%d").to_string()),
            "end" => self.date_range.map(|r| r.end.format("%Y-%m-%d").to_string()),
            "limit" => self.limit.map(|l| l.to_string()),
            _ => None,
        }
    }
}

/// Names of the placeholders used in `template`, in order of appearance.
#[cfg(test)]
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Whether `name` is a supported placeholder.
#[must_use]
pub fn is_known(name: &str) -> bool {
    PLACE_BOUND.contains(&name) || OPTIONAL.contains(&name) || REQUIRED.contains(&name)
}

/// Expands `template`.
///
/// Returns `Ok(None)` when the template should be dropped: an optional
/// filter is unset, or a place-bound value is missing during a global
/// check.
///
/// # Errors
///
/// Returns [`SourceError::Template`] for unknown placeholders and for
/// required values that are missing.
pub fn render(template: &str, ctx: &TemplateContext<'_>) -> Result<Option<String>, SourceError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();

        if !is_known(name) {
            return Err(SourceError::Template {
                message: format!("unknown placeholder {{{name}}} in '{template}'"),
            });
        }

        let Some(value) = ctx.value(name) else {
            if OPTIONAL.contains(&name) || (ctx.global && PLACE_BOUND.contains(&name)) {
                return Ok(None);
            }
            return Err(SourceError::Template {
                message: format!("no value for {{{name}}} in '{template}'"),
            });
        };

        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn range() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        }
    }

    #[test]
    fn expands_all_values() {
        let ctx = TemplateContext {
            place_id: Some("1500602"),
            date_range: Some(range()),
            ..TemplateContext::default()
        };
        let rendered = render("geocodibge='{place_id}' AND view_date>='{start}'", &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(rendered, "geocodibge='1500602' AND view_date>='2024-03-01'");
    }

    #[test]
    fn passes_literals_through() {
        let ctx = TemplateContext::default();
        assert_eq!(render("WFS", &ctx).unwrap().as_deref(), Some("WFS"));
    }

    #[test]
    fn drops_unset_optional_filters() {
        let ctx = TemplateContext::default();
        assert_eq!(render("{limit}", &ctx).unwrap(), None);
    }

    #[test]
    fn drops_place_values_for_global_check() {
        let ctx = TemplateContext {
            global: true,
            ..TemplateContext::default()
        };
        assert_eq!(render("{place_id}", &ctx).unwrap(), None);
    }

    #[test]
    fn missing_place_value_is_an_error_for_place_fetch() {
        let ctx = TemplateContext::default();
        assert!(matches!(
            render("{lat}", &ctx),
            Err(SourceError::Template { .. })
        ));
    }

    #[test]
    fn missing_partition_is_an_error() {
        let ctx = TemplateContext {
            global: true,
            ..TemplateContext::default()
        };
        assert!(render("https://x/{partition}/ows", &ctx).is_err());
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let ctx = TemplateContext::default();
        assert!(render("{api_key}", &ctx).is_err());
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(
            placeholders("{partition}:deter_public {place_id}"),
            vec!["partition", "place_id"]
        );
    }
}
