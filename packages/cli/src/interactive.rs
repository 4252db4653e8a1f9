//! Interactive menu for `envwatch`.
//!
//! Provides a `dialoguer` loop for running lookups without memorizing
//! flags. The pipeline lives for the whole session, so repeated lookups
//! are served from its cache until the user clears it.

use dialoguer::{Input, Select};
use envwatch_analytics_models::GroupBy;
use envwatch_pipeline::{DEFAULT_LOOKBACK_DAYS, DEFAULT_TOP_N, LookupRequest, Pipeline};
use envwatch_source::registry::{DEFAULT_SOURCE_ID, all_sources};

use crate::output;

/// Top-level actions available in the interactive menu.
enum Action {
    Lookup,
    Resolve,
    ListSources,
    SelfTest,
    ClearCache,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Lookup,
        Self::Resolve,
        Self::ListSources,
        Self::SelfTest,
        Self::ClearCache,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Lookup => "Look up a place",
            Self::Resolve => "Resolve a place name",
            Self::ListSources => "List sources",
            Self::SelfTest => "Check a source is reachable",
            Self::ClearCache => "Clear cached results",
            Self::Quit => "Quit",
        }
    }
}

const GROUP_BY_OPTIONS: &[GroupBy] = &[GroupBy::Category, GroupBy::Year, GroupBy::Month, GroupBy::Day];

/// Runs the interactive menu loop until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt fails (e.g., the terminal is not
/// interactive).
pub async fn run(mut pipeline: Pipeline) -> Result<(), Box<dyn std::error::Error>> {
    println!("envwatch: environmental data for Brazilian municipalities");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::Lookup => {
                let request = prompt_lookup()?;
                let outcome = pipeline.lookup(&request).await;
                let source = envwatch_source::registry::find_source(&request.source_id).ok();
                output::print_outcome(&outcome, source.as_ref(), request.group_by);
            }
            Action::Resolve => {
                let place = prompt_place()?;
                match pipeline.resolver().resolve(&place).await {
                    Ok(resolved) => {
                        let resolved = pipeline.resolver().ensure_coordinates(resolved).await;
                        output::print_place(&resolved);
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Action::ListSources => output::print_sources(&all_sources()),
            Action::SelfTest => {
                let source_id = prompt_source()?;
                match pipeline.self_test(&source_id, 5).await {
                    Ok(report) => output::print_self_test(&report),
                    Err(e) => output::print_misconfigured(&e.to_string()),
                }
            }
            Action::ClearCache => {
                pipeline.invalidate();
                println!("Cache cleared.");
            }
            Action::Quit => break,
        }
        println!();
    }

    Ok(())
}

fn prompt_place() -> Result<String, Box<dyn std::error::Error>> {
    Ok(Input::<String>::new()
        .with_prompt("Place name")
        .default("Altamira".to_string())
        .interact_text()?)
}

fn prompt_source() -> Result<String, Box<dyn std::error::Error>> {
    let sources = all_sources();
    let labels: Vec<String> = sources
        .iter()
        .map(|s| format!("{} ({})", s.name, s.id))
        .collect();
    let default = sources
        .iter()
        .position(|s| s.id == DEFAULT_SOURCE_ID)
        .unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Source")
        .items(&labels)
        .default(default)
        .interact()?;

    Ok(sources[idx].id.clone())
}

fn prompt_lookup() -> Result<LookupRequest, Box<dyn std::error::Error>> {
    let place = prompt_place()?;
    let source_id = prompt_source()?;

    let days: u32 = Input::new()
        .with_prompt("Lookback window (days)")
        .default(DEFAULT_LOOKBACK_DAYS)
        .interact_text()?;

    let limit = prompt_optional_usize("Record limit (empty for no limit)")?;

    let group_labels: Vec<String> = GROUP_BY_OPTIONS.iter().map(ToString::to_string).collect();
    let group_idx = Select::new()
        .with_prompt("Group totals by")
        .items(&group_labels)
        .default(0)
        .interact()?;

    Ok(LookupRequest {
        place,
        source_id,
        days,
        limit,
        group_by: GROUP_BY_OPTIONS[group_idx],
        top_n: DEFAULT_TOP_N,
    })
}

fn prompt_optional_usize(prompt: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .validate_with(|input: &String| parse_optional_usize(input).map(|_| ()))
        .interact_text()?;

    Ok(parse_optional_usize(&input)?)
}

/// Empty input means no value; anything else must be a whole number.
fn parse_optional_usize(input: &str) -> Result<Option<usize>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    input
        .parse()
        .map(Some)
        .map_err(|_| format!("'{input}' is not a whole number"))
}
