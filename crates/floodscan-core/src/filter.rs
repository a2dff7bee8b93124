//! The two post-crawl filters.
//!
//! Relevance is plain substring containment on the lowercased
//! `"{title} {summary}"`, so a keyword inside a longer word still counts.
//! Both filters are pure and keep input order.

use chrono::{DateTime, FixedOffset};

use crate::models::{Record, TimeRange};
use crate::taxonomy::Taxonomy;

/// True if the record mentions a taxonomy keyword and, when given, the
/// required location.
pub fn is_relevant(record: &Record, taxonomy: &Taxonomy, required_location: Option<&str>) -> bool {
    let text = format!("{} {}", record.title, record.summary).to_lowercase();

    if !taxonomy.matches_folded(&text) {
        return false;
    }
    match required_location {
        Some(location) => text.contains(&location.trim().to_lowercase()),
        None => true,
    }
}

/// True if the record may be kept under `range`.
///
/// With no bounds everything passes; with any bound, records without a
/// publish time are dropped.
pub fn in_range(record: &Record, range: &TimeRange) -> bool {
    if range.is_unbounded() {
        return true;
    }
    match record.published_at {
        Some(at) => within(at, range),
        None => false,
    }
}

fn within(at: DateTime<FixedOffset>, range: &TimeRange) -> bool {
    range.start.is_none_or(|start| at >= start) && range.end.is_none_or(|end| at <= end)
}

/// Keep only relevant records, preserving order.
pub fn filter_relevant(
    records: Vec<Record>,
    taxonomy: &Taxonomy,
    required_location: Option<&str>,
) -> Vec<Record> {
    let total = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| {
            let keep = is_relevant(r, taxonomy, required_location);
            if !keep {
                tracing::debug!(title = %r.title, "Dropping unrelated record");
            }
            keep
        })
        .collect();
    tracing::info!(
        taxonomy = taxonomy.name(),
        total,
        kept = kept.len(),
        "Relevance filter applied"
    );
    kept
}

/// Keep only records inside `range`, preserving order.
pub fn filter_time_range(records: Vec<Record>, range: &TimeRange) -> Vec<Record> {
    if range.is_unbounded() {
        return records;
    }
    let total = records.len();
    let kept: Vec<Record> = records.into_iter().filter(|r| in_range(r, range)).collect();
    tracing::info!(total, kept = kept.len(), "Time filter applied");
    kept
}
