//! Occurrence resolver: calendar tuple + "now" to an absolute UTC timestamp.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use herald_core::CalendarTuple;

/// Resolve a tuple to its next occurrence relative to `now`.
///
/// The candidate is built in the current year. If it lies more than `slack`
/// in the past it is moved to the same month/day/hour/minute one year later.
///
/// Returns `None` when the tuple is not a real calendar instant (Feb 30,
/// hour 24, ...) or when the rolled-over date does not exist (Feb 29 moving
/// into a non-leap year).
pub fn resolve(tuple: &CalendarTuple, now: DateTime<Utc>, slack: Duration) -> Option<DateTime<Utc>> {
    let candidate = Utc
        .with_ymd_and_hms(now.year(), tuple.month, tuple.day, tuple.hour, tuple.minute, 0)
        .single()?;

    if candidate < now - slack {
        candidate.with_year(now.year() + 1)
    } else {
        Some(candidate)
    }
}
