//! Firing-window predicate over the sorted occurrence list.

use chrono::{DateTime, Utc};
use serde::Serialize;

use herald_core::config::{TimingConfig, DEFAULT_WINDOW_LOWER_SECS, DEFAULT_WINDOW_UPPER_SECS};
use herald_core::Occurrence;
use herald_ledger::NotificationLedger;

/// Closed interval of "seconds until start" in which a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FiringWindow {
    pub lower_secs: i64,
    pub upper_secs: i64,
}

impl FiringWindow {
    pub const fn new(lower_secs: i64, upper_secs: i64) -> Self {
        Self { lower_secs, upper_secs }
    }

    pub fn contains(&self, seconds_until: f64) -> bool {
        seconds_until >= self.lower_secs as f64 && seconds_until <= self.upper_secs as f64
    }
}

impl Default for FiringWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LOWER_SECS, DEFAULT_WINDOW_UPPER_SECS)
    }
}

impl From<&TimingConfig> for FiringWindow {
    fn from(timing: &TimingConfig) -> Self {
        Self::new(timing.window_lower_secs, timing.window_upper_secs)
    }
}

/// Occurrences that should fire at `now`: inside `window` and not yet in
/// the ledger, in ascending start order.
///
/// `occurrences` must be sorted ascending by `starts_at`; the scan stops at
/// the first occurrence beyond the window's upper bound.
pub fn due_occurrences<'a>(
    occurrences: &'a [Occurrence],
    ledger: &NotificationLedger,
    now: DateTime<Utc>,
    window: FiringWindow,
) -> Vec<&'a Occurrence> {
    let mut due = Vec::new();
    for occ in occurrences {
        let seconds_until = occ.seconds_until(now);
        if seconds_until > window.upper_secs as f64 {
            break;
        }
        if !window.contains(seconds_until) || ledger.is_notified(&occ.key) {
            continue;
        }
        due.push(occ);
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 18, 0, 0).unwrap()
    }

    fn empty_ledger() -> (TempDir, NotificationLedger) {
        let dir = TempDir::new().unwrap();
        let ledger = NotificationLedger::open(dir.path().join("notified.json"));
        (dir, ledger)
    }

    #[test]
    fn fires_just_inside_the_window() {
        let (_dir, ledger) = empty_ledger();
        let occs = vec![Occurrence::new("ruins", start())];
        let now = Utc.with_ymd_and_hms(2025, 2, 3, 17, 0, 5).unwrap() + Duration::milliseconds(50);

        assert!((occs[0].seconds_until(now) - 3594.95).abs() < 1e-9);
        let due = due_occurrences(&occs, &ledger, now, FiringWindow::default());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "ruins:2025-02-03T18:00:00Z");
    }

    #[test]
    fn too_early_does_not_fire() {
        let (_dir, ledger) = empty_ledger();
        let occs = vec![Occurrence::new("ruins", start())];
        let now = Utc.with_ymd_and_hms(2025, 2, 3, 16, 59, 0).unwrap();

        assert_eq!(occs[0].seconds_until(now), 3660.0);
        assert!(due_occurrences(&occs, &ledger, now, FiringWindow::default()).is_empty());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let (_dir, ledger) = empty_ledger();
        let occs = vec![Occurrence::new("ruins", start())];
        let window = FiringWindow::default();

        let at_upper = start() - Duration::seconds(3630);
        let at_lower = start() - Duration::seconds(3570);
        let past_lower = start() - Duration::seconds(3569);
        assert_eq!(due_occurrences(&occs, &ledger, at_upper, window).len(), 1);
        assert_eq!(due_occurrences(&occs, &ledger, at_lower, window).len(), 1);
        assert!(due_occurrences(&occs, &ledger, past_lower, window).is_empty());
    }

    #[test]
    fn notified_occurrence_never_fires_again() {
        let (_dir, mut ledger) = empty_ledger();
        let occs = vec![Occurrence::new("ruins", start())];
        ledger.mark_notified(&occs[0].key).unwrap();

        for offset in [3570, 3600, 3630] {
            let now = start() - Duration::seconds(offset);
            assert!(due_occurrences(&occs, &ledger, now, FiringWindow::default()).is_empty());
        }
    }

    #[test]
    fn same_instant_different_types_both_fire() {
        let (_dir, mut ledger) = empty_ledger();
        let occs = vec![Occurrence::new("ruins", start()), Occurrence::new("altar", start())];
        let now = start() - Duration::seconds(3600);

        let due = due_occurrences(&occs, &ledger, now, FiringWindow::default());
        assert_eq!(due.len(), 2);

        ledger.mark_notified(&occs[0].key).unwrap();
        let due = due_occurrences(&occs, &ledger, now, FiringWindow::default());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].event_type, "altar");
    }

    #[test]
    fn past_and_far_future_occurrences_are_ignored() {
        let (_dir, ledger) = empty_ledger();
        let now = start() - Duration::seconds(3600);
        let occs = vec![
            Occurrence::new("ruins", now - Duration::hours(2)),
            Occurrence::new("ruins", start()),
            Occurrence::new("ruins", start() + Duration::days(1)),
        ];

        let due = due_occurrences(&occs, &ledger, now, FiringWindow::default());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].starts_at, start());
    }

    #[test]
    fn window_from_timing_config() {
        let timing = TimingConfig {
            window_lower_secs: 1770,
            window_upper_secs: 1830,
            ..TimingConfig::default()
        };
        let window = FiringWindow::from(&timing);
        assert!(window.contains(1800.0));
        assert!(!window.contains(3600.0));
    }
}
