//! End-to-end schedule scenarios through the public API.

use std::fs;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use herald_core::{CalendarTuple, ScheduleSource};
use herald_schedule::{parse_line, query, resolve, ScheduleLoader};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn parse_resolve_reformat_roundtrip() {
    let now = utc(2025, 7, 1, 0, 0, 0);
    let lines = [
        "1.1. 0:00",
        "Fri, 4.7. 12:30",
        "31.12. 23:59",
        "15.8.  7:05",
        "Sun 29.6. 18:00",
    ];
    for line in lines {
        let tuple = parse_line(line).expect("line parses");
        let ts = resolve(&tuple, now, Duration::minutes(5)).expect("line resolves");
        assert_eq!(CalendarTuple::from(ts), tuple, "roundtrip for {line:?}");
    }
}

#[test]
fn rollover_is_exactly_one_year() {
    let now = utc(2025, 6, 1, 0, 0, 0);
    let tuple = CalendarTuple::new(3, 2, 18, 0);
    let naive = utc(2025, 2, 3, 18, 0, 0);
    let ts = resolve(&tuple, now, Duration::minutes(5)).unwrap();
    assert_eq!(ts, utc(2026, 2, 3, 18, 0, 0));
    assert!(ts > naive);
}

#[test]
fn decorated_duplicate_yields_one_occurrence() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ruins.txt"), "Mon, 3.2. 18:00\n3.2. 18:00\n").unwrap();

    let loader = ScheduleLoader::new(
        dir.path().to_path_buf(),
        vec![ScheduleSource::new("ruins", "ruins.txt").resolved_in(dir.path())],
        Duration::minutes(5),
    );
    let outcome = loader.load(utc(2025, 1, 1, 0, 0, 0));

    assert_eq!(outcome.occurrences.len(), 1);
    assert_eq!(outcome.occurrences[0].key, "ruins:2025-02-03T18:00:00Z");
}

#[test]
fn loads_are_idempotent_within_a_year() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n10.3. 20:00\n1.1. 12:00\n").unwrap();
    fs::write(dir.path().join("altar.txt"), "# altar\n3.2. 18:00\nbogus\n").unwrap();

    let loader = ScheduleLoader::new(
        dir.path().to_path_buf(),
        vec![
            ScheduleSource::new("ruins", "ruins.txt").resolved_in(dir.path()),
            ScheduleSource::new("altar", "altar.txt").resolved_in(dir.path()),
        ],
        Duration::minutes(5),
    );

    let now = utc(2025, 1, 20, 8, 0, 0);
    let first: Vec<String> = loader.load(now).occurrences.into_iter().map(|o| o.key).collect();
    let second: Vec<String> = loader.load(now).occurrences.into_iter().map(|o| o.key).collect();
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            "ruins:2025-02-03T18:00:00Z",
            "altar:2025-02-03T18:00:00Z",
            "ruins:2025-03-10T20:00:00Z",
            "ruins:2026-01-01T12:00:00Z",
        ]
    );
}

#[test]
fn week_and_month_views() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n6.2. 18:00\n20.2. 18:00\n").unwrap();
    let loader = ScheduleLoader::new(
        dir.path().to_path_buf(),
        vec![ScheduleSource::new("ruins", "ruins.txt").resolved_in(dir.path())],
        Duration::minutes(5),
    );
    let now = utc(2025, 2, 1, 0, 0, 0);
    let occs = loader.load(now).occurrences;

    assert_eq!(query::within_days(&occs, now, 7).len(), 2);
    assert_eq!(query::within_months(&occs, now, 1).len(), 3);
    assert_eq!(
        query::next_at_or_after(&occs, now).map(|o| o.starts_at),
        Some(utc(2025, 2, 3, 18, 0, 0))
    );
}
