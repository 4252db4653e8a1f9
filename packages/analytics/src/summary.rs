//! Grouped totals, top-N ranking and most-recent lookup.

use std::collections::HashMap;

use envwatch_analytics_models::{GroupBy, GroupTotal, SummaryResult, UNCATEGORIZED};
use envwatch_source_models::Record;

/// Bucket key of `record` under `group_by`.
fn group_key(record: &Record, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Category => record
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        GroupBy::Year => record.timestamp.format("%Y").to_string(),
        GroupBy::Month => record.timestamp.format("%Y-%m").to_string(),
        GroupBy::Day => record.timestamp.format("%Y-%m-%d").to_string(),
    }
}

/// Summarizes `records`.
///
/// `grouped_totals` lists keys in the order they first appear, and
/// `top_n` holds at most `top_n` groups sorted by descending magnitude with
/// ties in encounter order.
#[must_use]
pub fn summarize(records: &[Record], group_by: GroupBy, top_n: usize) -> SummaryResult {
    let mut grouped_totals: Vec<GroupTotal> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut total_magnitude = 0.0;
    let mut most_recent: Option<&Record> = None;

    for record in records {
        total_magnitude += record.magnitude;

        let key = group_key(record, group_by);
        if let Some(&pos) = positions.get(&key) {
            grouped_totals[pos].magnitude += record.magnitude;
        } else {
            positions.insert(key.clone(), grouped_totals.len());
            grouped_totals.push(GroupTotal {
                key,
                magnitude: record.magnitude,
            });
        }

        if most_recent.is_none_or(|best| record.timestamp > best.timestamp) {
            most_recent = Some(record);
        }
    }

    let mut ranked = grouped_totals.clone();
    ranked.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    ranked.truncate(top_n);

    log::debug!(
        "Summarized {} records into {} {group_by} groups",
        records.len(),
        grouped_totals.len()
    );

    SummaryResult {
        total_count: records.len(),
        total_magnitude,
        grouped_totals,
        top_n: ranked,
        most_recent: most_recent.cloned(),
    }
}
