//! Read-only CLI views over the resolved occurrence list.

use chrono::{DateTime, Utc};

use herald_core::{CalendarTuple, Config, Occurrence};
use herald_schedule::{query, LoadOutcome, ScheduleLoader, SourceReport};

/// Resolve all configured sources at `now`.
pub fn load(config: &Config, now: DateTime<Utc>) -> anyhow::Result<LoadOutcome> {
    let sources = config.schedule.sources()?;
    let loader = ScheduleLoader::new(config.schedule.dir.clone(), sources, config.timing.near_past_slack());
    Ok(loader.load(now))
}

/// How far ahead `upcoming` looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Days(u32),
    Months(u32),
}

/// Human-friendly "time until", e.g. `2d 3h 5m`. Negative spans read `now`.
pub fn format_eta(seconds: i64) -> String {
    if seconds <= 0 {
        return "now".to_string();
    }
    let minutes = (seconds + 59) / 60;
    let (days, hours, mins) = (minutes / 1440, (minutes % 1440) / 60, minutes % 60);
    match (days, hours) {
        (0, 0) => format!("{mins}m"),
        (0, _) => format!("{hours}h {mins}m"),
        _ => format!("{days}d {hours}h {mins}m"),
    }
}

fn line(occ: &Occurrence, now: DateTime<Utc>) -> String {
    format!(
        "{:<12} {} {:>11} UTC  (in {})",
        occ.event_type,
        occ.starts_at.format("%a"),
        CalendarTuple::from(occ.starts_at).to_string(),
        format_eta((occ.starts_at - now).num_seconds())
    )
}

/// Next occurrence for each event type.
pub fn render_status(occurrences: &[Occurrence], now: DateTime<Utc>) -> String {
    let next = query::next_per_type(occurrences, now);
    if next.is_empty() {
        return "No upcoming events.".to_string();
    }
    next.values().map(|occ| line(occ, now)).collect::<Vec<_>>().join("\n")
}

/// Every occurrence within `span` of `now`, ascending.
pub fn render_upcoming(occurrences: &[Occurrence], now: DateTime<Utc>, span: Span) -> String {
    let (selected, label) = match span {
        Span::Days(n) => (query::within_days(occurrences, now, n), format!("{n} day(s)")),
        Span::Months(n) => (query::within_months(occurrences, now, n), format!("{n} month(s)")),
    };
    if selected.is_empty() {
        return format!("No events in the next {label}.");
    }
    let mut out = format!("{} event(s) in the next {label}:", selected.len());
    for occ in selected {
        out.push('\n');
        out.push_str(&line(occ, now));
    }
    out
}

/// Per-source parse report. Returns the text and whether any line was skipped
/// or any source was unreadable.
pub fn render_check(reports: &[SourceReport]) -> (String, bool) {
    let mut problems = false;
    let mut out = Vec::with_capacity(reports.len());
    for r in reports {
        let state = if r.missing {
            problems = true;
            "missing".to_string()
        } else if let Some(err) = &r.read_error {
            problems = true;
            format!("unreadable: {err}")
        } else if r.skipped > 0 {
            problems = true;
            let lines: Vec<String> = r.skipped_lines.iter().map(|n| n.to_string()).collect();
            format!("skipped lines {}", lines.join(", "))
        } else {
            "ok".to_string()
        };
        out.push(format!(
            "{:<12} {}  parsed={} duplicates={} skipped={}  [{}]",
            r.event_type,
            r.path.display(),
            r.parsed,
            r.duplicates,
            r.skipped,
            state
        ));
    }
    (out.join("\n"), problems)
}
