//! Read-only views over a time-sorted occurrence list.
//!
//! All functions assume the slice is ascending by `starts_at`, as produced
//! by [`ScheduleLoader::load`](crate::ScheduleLoader::load), and return
//! occurrences in that same order.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Utc};
use herald_core::Occurrence;

/// Occurrences starting in `[from, until)`.
pub fn between(occurrences: &[Occurrence], from: DateTime<Utc>, until: DateTime<Utc>) -> &[Occurrence] {
    let start = occurrences.partition_point(|o| o.starts_at < from);
    let end = occurrences.partition_point(|o| o.starts_at < until).max(start);
    &occurrences[start..end]
}

/// First occurrence starting at or after `now`.
pub fn next_at_or_after(occurrences: &[Occurrence], now: DateTime<Utc>) -> Option<&Occurrence> {
    let idx = occurrences.partition_point(|o| o.starts_at < now);
    occurrences.get(idx)
}

/// First occurrence of `event_type` starting at or after `now`.
pub fn next_of_type<'a>(occurrences: &'a [Occurrence], event_type: &str, now: DateTime<Utc>) -> Option<&'a Occurrence> {
    let idx = occurrences.partition_point(|o| o.starts_at < now);
    occurrences[idx..].iter().find(|o| o.event_type == event_type)
}

/// Next upcoming occurrence for every event type, keyed by type.
pub fn next_per_type(occurrences: &[Occurrence], now: DateTime<Utc>) -> BTreeMap<&str, &Occurrence> {
    let idx = occurrences.partition_point(|o| o.starts_at < now);
    let mut next = BTreeMap::new();
    for occ in &occurrences[idx..] {
        next.entry(occ.event_type.as_str()).or_insert(occ);
    }
    next
}

/// Occurrences starting within `days` days of `now`.
///
/// Spans reaching past the representable range cover everything ahead.
pub fn within_days(occurrences: &[Occurrence], now: DateTime<Utc>, days: u32) -> &[Occurrence] {
    let until = now
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    between(occurrences, now, until)
}

/// Occurrences starting within `months` calendar months of `now`.
///
/// Month arithmetic clamps to the end of shorter months (Jan 31 + 1 month
/// is Feb 28/29).
pub fn within_months(occurrences: &[Occurrence], now: DateTime<Utc>, months: u32) -> &[Occurrence] {
    let until = now
        .checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    between(occurrences, now, until)
}
