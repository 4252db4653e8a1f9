#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `envwatch` command-line entry point.
//!
//! Looks up deforestation alerts, fire hotspots and air quality for a
//! Brazilian municipality. Without a subcommand it falls back to an
//! interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`envwatch_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the attempt bar never fight for the terminal.

mod interactive;
mod output;

use std::time::Duration;

use clap::{Parser, Subcommand};
use envwatch_analytics_models::GroupBy;
use envwatch_cli_utils::IndicatifProgress;
use envwatch_pipeline::{DEFAULT_LOOKBACK_DAYS, DEFAULT_TOP_N, LookupRequest, Pipeline};
use envwatch_source::registry::{DEFAULT_SOURCE_ID, all_sources, find_source};

#[derive(Parser)]
#[command(
    name = "envwatch",
    about = "Environmental data lookup for Brazilian municipalities"
)]
struct Cli {
    /// Seconds a lookup result stays cached within one session
    #[arg(long, global = true, default_value_t = 3600)]
    cache_ttl: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up recent data for a place and summarize it
    Lookup {
        /// Place name (e.g., "Altamira", "Lábrea")
        place: String,
        /// Source identifier (see `envwatch sources`)
        #[arg(long, default_value = DEFAULT_SOURCE_ID)]
        source: String,
        /// Lookback window in days, ending today
        #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
        days: u32,
        /// Keep only the first N records, in provider order
        #[arg(long)]
        limit: Option<usize>,
        /// Group totals by category, year, month or day
        #[arg(long, default_value = "category", value_parser = parse_group_by)]
        group_by: GroupBy,
        /// Number of groups in the ranking
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a place name to its municipality code
    Resolve {
        /// Place name
        place: String,
        /// Also attach coordinates (geocoding if needed)
        #[arg(long)]
        coordinates: bool,
    },
    /// List all configured data sources
    Sources,
    /// Check that a source is reachable without a place filter
    SelfTest {
        /// Source identifier
        #[arg(long, default_value = DEFAULT_SOURCE_ID)]
        source: String,
        /// Number of recent records to request
        #[arg(long, default_value_t = 5)]
        limit: u64,
    },
}

fn parse_group_by(value: &str) -> Result<GroupBy, String> {
    value
        .parse()
        .map_err(|_| format!("'{value}' is not one of: category, year, month, day"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = envwatch_cli_utils::init_logger();
    let cli = Cli::parse();
    let ttl = Duration::from_secs(cli.cache_ttl);

    let Some(command) = cli.command else {
        let pipeline = Pipeline::from_env(IndicatifProgress::attempts_bar(&multi))?.with_ttl(ttl);
        return interactive::run(pipeline).await;
    };

    match command {
        Commands::Lookup {
            place,
            source,
            days,
            limit,
            group_by,
            top,
            json,
        } => {
            let mut pipeline =
                Pipeline::from_env(IndicatifProgress::attempts_bar(&multi))?.with_ttl(ttl);
            let request = LookupRequest {
                place,
                source_id: source,
                days,
                limit,
                group_by,
                top_n: top,
            };
            log::debug!("Lookup '{}' on {}", request.place, request.source_id);
            let outcome = pipeline.lookup(&request).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                let definition = find_source(&request.source_id).ok();
                output::print_outcome(&outcome, definition.as_ref(), request.group_by);
            }
        }
        Commands::Resolve { place, coordinates } => {
            let pipeline = Pipeline::from_env(IndicatifProgress::attempts_bar(&multi))?;
            match pipeline.resolver().resolve(&place).await {
                Ok(resolved) => {
                    let resolved = if coordinates {
                        pipeline.resolver().ensure_coordinates(resolved).await
                    } else {
                        resolved
                    };
                    output::print_place(&resolved);
                }
                Err(e) => println!("{e}"),
            }
        }
        Commands::Sources => output::print_sources(&all_sources()),
        Commands::SelfTest { source, limit } => {
            let pipeline = Pipeline::from_env(IndicatifProgress::attempts_bar(&multi))?;
            match pipeline.self_test(&source, limit).await {
                Ok(report) => output::print_self_test(&report),
                Err(e) => output::print_misconfigured(&e.to_string()),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lookup_flags() {
        let cli = Cli::try_parse_from([
            "envwatch",
            "lookup",
            "Altamira",
            "--source",
            "gfw_integrated_alerts",
            "--group-by",
            "month",
            "--limit",
            "10",
        ])
        .unwrap();
        let Some(Commands::Lookup {
            place,
            source,
            group_by,
            limit,
            days,
            ..
        }) = cli.command
        else {
            panic!("expected lookup");
        };
        assert_eq!(place, "Altamira");
        assert_eq!(source, "gfw_integrated_alerts");
        assert_eq!(group_by, GroupBy::Month);
        assert_eq!(limit, Some(10));
        assert_eq!(days, DEFAULT_LOOKBACK_DAYS);
    }

    #[test]
    fn rejects_unknown_grouping() {
        assert!(Cli::try_parse_from(["envwatch", "lookup", "Altamira", "--group-by", "week"]).is_err());
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["envwatch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.cache_ttl, 3600);
    }
}
