//! Terminal rendering of lookup outcomes.
//!
//! Every `render_*` function returns the text instead of printing it so
//! the layout can be checked in tests.

use std::fmt::Write as _;

use console::style;
use envwatch_analytics::{classify_air_quality, pm25_danger_ratio};
use envwatch_analytics_models::{AdvisoryLevel, GroupBy, GroupTotal};
use envwatch_pipeline::{LookupOutcome, Report, SelfTestReport};
use envwatch_place_models::Place;
use envwatch_source::SourceDefinition;
use envwatch_source_models::{Record, SourceKind};

const DANGER_BAR_WIDTH: usize = 20;

/// Prints a lookup outcome.
pub fn print_outcome(outcome: &LookupOutcome, source: Option<&SourceDefinition>, group_by: GroupBy) {
    println!("{}", render_outcome(outcome, source, group_by));
}

/// Prints a resolved place.
pub fn print_place(place: &Place) {
    println!("{}", render_place(place));
}

/// Prints the source table.
pub fn print_sources(sources: &[SourceDefinition]) {
    println!("{:<24} {:<24} NAME", "ID", "KIND");
    println!("{}", "-".repeat(80));
    for source in sources {
        let credential = source
            .credential
            .as_ref()
            .map(|c| format!(" (needs {})", c.env))
            .unwrap_or_default();
        println!(
            "{:<24} {:<24} {}{credential}",
            source.id,
            source.kind.as_ref(),
            source.name
        );
    }
}

/// Prints a self-test result.
pub fn print_self_test(report: &SelfTestReport) {
    println!("{}", render_self_test(report));
}

/// Prints a configuration problem found before any request was sent.
pub fn print_misconfigured(message: &str) {
    println!("{}", render_misconfigured(message));
}

/// One line per self-test: healthy, answered without records, or failed.
pub fn render_self_test(report: &SelfTestReport) -> String {
    match (&report.descriptor, report.is_healthy()) {
        (Some(descriptor), true) => format!(
            "{} {}: {} record(s) after {} attempt(s) via {}",
            style("OK").green().bold(),
            report.source_id,
            report.records,
            report.attempts,
            descriptor.path_id
        ),
        (Some(descriptor), false) => format!(
            "{} {}: answered via {} but returned no records",
            style("EMPTY").yellow().bold(),
            report.source_id,
            descriptor.path_id
        ),
        (None, _) => format!(
            "{} {}: no usable data after {} attempt(s)",
            style("FAIL").red().bold(),
            report.source_id,
            report.attempts
        ),
    }
}

/// Configuration message with a red label.
pub fn render_misconfigured(message: &str) -> String {
    format!("{} {message}", style("Configuration problem:").red().bold())
}

/// Text for any lookup outcome.
pub fn render_outcome(
    outcome: &LookupOutcome,
    source: Option<&SourceDefinition>,
    group_by: GroupBy,
) -> String {
    match outcome {
        LookupOutcome::Misconfigured { message } => render_misconfigured(message),
        LookupOutcome::NotFound { query } => {
            format!("No municipality matches '{query}'. Check the spelling and try again.")
        }
        LookupOutcome::Unreachable { place, attempts } => format!(
            "{}\n{} the source could not be reached ({attempts} attempt(s) failed). Try again later.",
            render_place(place),
            style("Unavailable:").yellow().bold()
        ),
        LookupOutcome::NoData { place, descriptor } => format!(
            "{}\nNo records for this period (answered via {}).",
            render_place(place),
            descriptor.path_id
        ),
        LookupOutcome::Ready(report) => render_report(report, source, group_by),
    }
}

/// `Name (UF) [id]`, plus coordinates and their origin when known.
pub fn render_place(place: &Place) -> String {
    let mut out = format!(
        "{} [{}]",
        style(&place.canonical_name).bold(),
        place.resolved_id
    );
    if let Some(point) = place.coordinates {
        let origin = place
            .coordinate_source
            .map(|s| format!(", {s}"))
            .unwrap_or_default();
        let _ = write!(out, " at {:.4}, {:.4}{origin}", point.latitude, point.longitude);
    }
    out
}

/// Place header, source line, totals and, for air quality, the advisory.
pub fn render_report(report: &Report, source: Option<&SourceDefinition>, group_by: GroupBy) -> String {
    let kind = report.descriptor.kind;
    let unit = kind.unit();
    let summary = &report.summary;
    let mut out = render_place(&report.place);

    let name = source.map_or(report.descriptor.source_id.as_str(), |s| s.name.as_str());
    let partition = report
        .descriptor
        .partition
        .as_deref()
        .map(|p| format!(" / {p}"))
        .unwrap_or_default();
    let _ = write!(
        out,
        "\nSource: {name}{partition} (via {})",
        report.descriptor.path_id
    );
    let _ = write!(
        out,
        "\nRecords: {} | Total: {:.2} {unit}",
        summary.total_count, summary.total_magnitude
    );

    if let Some(recent) = &summary.most_recent {
        let category = recent
            .category
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let _ = write!(
            out,
            "\nMost recent: {} {:.2} {unit}{category}",
            recent.timestamp.format("%Y-%m-%d %H:%M UTC"),
            recent.magnitude
        );
        for (name, value) in &recent.readings {
            let _ = write!(out, "\n  {}: {value:.2} {unit}", name.to_uppercase());
        }

        if kind == SourceKind::AirQuality {
            out.push_str(&render_air_quality(recent, source));
        }
    }

    let _ = write!(out, "\n\nTotals by {group_by}:");
    out.push_str(&render_totals(&summary.grouped_totals, unit));

    if summary.top_n.len() < summary.grouped_totals.len() {
        let _ = write!(out, "\n\nTop {}:", summary.top_n.len());
        out.push_str(&render_totals(&summary.top_n, unit));
    }

    out
}

fn render_totals(totals: &[GroupTotal], unit: &str) -> String {
    let width = totals.iter().map(|g| g.key.chars().count()).max().unwrap_or(0);
    totals
        .iter()
        .map(|g| format!("\n  {:<width$}  {:>12.2} {unit}", g.key, g.magnitude))
        .collect()
}

/// Index behind a record category, using the source's label table when the
/// category is a display label.
fn air_quality_index(category: &str, source: Option<&SourceDefinition>) -> Option<u8> {
    source
        .map_or(category, |s| s.fields.raw_category(category))
        .trim()
        .parse()
        .ok()
}

fn render_air_quality(recent: &Record, source: Option<&SourceDefinition>) -> String {
    let mut out = String::new();

    if let Some(category) = recent.category.as_deref()
        && let Some(index) = air_quality_index(category, source)
    {
        let class = classify_air_quality(index);
        let headline = format!("Air quality: {category} (index {})", class.index);
        let headline = match class.advisory {
            AdvisoryLevel::Clear => style(headline).green(),
            AdvisoryLevel::SensitiveGroups => style(headline).yellow(),
            AdvisoryLevel::Alert => style(headline).red().bold(),
            AdvisoryLevel::Unknown => style(headline).dim(),
        };
        let _ = write!(out, "\n{headline}\n{}", class.advisory.message());
    }

    let _ = write!(
        out,
        "\nPM2.5 danger: [{}]",
        danger_bar(pm25_danger_ratio(recent.magnitude))
    );
    out
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn danger_bar(ratio: f64) -> String {
    let filled = ((ratio * DANGER_BAR_WIDTH as f64).round() as usize).min(DANGER_BAR_WIDTH);
    format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(DANGER_BAR_WIDTH - filled)
    )
}
