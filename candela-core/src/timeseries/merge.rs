use std::collections::btree_map::Entry;

use candela_types::MergeStats;

use super::TimeSeries;

/// Merge a newer fetch into an existing series.
///
/// - Rows of `newer` overwrite rows of `existing` at the same timestamp.
/// - Rows of `existing` outside `newer` are preserved, so the result never
///   has fewer rows than `existing`.
/// - The result is ascending with unique timestamps.
#[must_use]
pub fn merge_newer_wins(existing: TimeSeries, newer: TimeSeries) -> (TimeSeries, MergeStats) {
    let mut stats = MergeStats::default();
    let mut rows = existing.into_rows();
    let before = rows.len();
    for c in newer {
        match rows.entry(c.ts) {
            Entry::Vacant(v) => {
                v.insert(c);
                stats.inserted += 1;
            }
            Entry::Occupied(mut o) => {
                o.insert(c);
                stats.replaced += 1;
            }
        }
    }
    stats.preserved = before - stats.replaced;
    (TimeSeries::from_rows(rows), stats)
}
