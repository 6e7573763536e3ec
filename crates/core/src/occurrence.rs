//! Schedule data model: sources, calendar tuples, and resolved occurrences.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HeraldError;

/// One schedule input: an event type tag and the file its lines are read from.
///
/// Sources are re-read on every load; the struct itself never changes after
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSource {
    /// Event type tag, e.g. `"ruins"` or `"altar"`. Never contains `:`.
    pub event_type: String,
    /// Path to the plain-text schedule file.
    pub path: PathBuf,
}

impl ScheduleSource {
    pub fn new(event_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            event_type: event_type.into(),
            path: path.into(),
        }
    }

    /// Return a copy whose relative path is resolved against `dir`.
    pub fn resolved_in(&self, dir: &Path) -> Self {
        let path = if self.path.is_absolute() {
            self.path.clone()
        } else {
            dir.join(&self.path)
        };
        Self {
            event_type: self.event_type.clone(),
            path,
        }
    }
}

/// Parses `type=file` (e.g. `ruins=ruins.txt`).
impl FromStr for ScheduleSource {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (event_type, file) = s
            .trim()
            .split_once('=')
            .ok_or_else(|| HeraldError::InvalidSource(s.to_string()))?;
        let event_type = event_type.trim();
        let file = file.trim();
        if event_type.is_empty() || file.is_empty() || event_type.contains(':') {
            return Err(HeraldError::InvalidSource(s.to_string()));
        }
        Ok(Self::new(event_type, file))
    }
}

/// Day/month/hour/minute as written in a schedule line.
///
/// Only the shape is guaranteed by the parser; calendar validity (e.g. no
/// 30th of February) is checked when the tuple is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarTuple {
    pub day: u32,
    pub month: u32,
    pub hour: u32,
    pub minute: u32,
}

impl CalendarTuple {
    pub fn new(day: u32, month: u32, hour: u32, minute: u32) -> Self {
        Self {
            day,
            month,
            hour,
            minute,
        }
    }
}

impl From<DateTime<Utc>> for CalendarTuple {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::new(ts.day(), ts.month(), ts.hour(), ts.minute())
    }
}

impl fmt::Display for CalendarTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}. {}:{:02}", self.day, self.month, self.hour, self.minute)
    }
}

/// One concrete upcoming firing of a recurring event.
///
/// Rebuilt from scratch on every schedule load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    #[serde(rename = "type")]
    pub event_type: String,
    pub starts_at: DateTime<Utc>,
    /// `<type>:<RFC 3339 timestamp>`; identity for dedup and the ledger.
    pub key: String,
}

impl Occurrence {
    pub fn new(event_type: impl Into<String>, starts_at: DateTime<Utc>) -> Self {
        let event_type = event_type.into();
        let key = occurrence_key(&event_type, starts_at);
        Self {
            event_type,
            starts_at,
            key,
        }
    }

    /// Seconds from `now` until the occurrence starts, millisecond precision.
    /// Negative once the start has passed.
    pub fn seconds_until(&self, now: DateTime<Utc>) -> f64 {
        (self.starts_at - now).num_milliseconds() as f64 / 1000.0
    }
}

/// Format a timestamp the way it is embedded in occurrence keys.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the composite key `<type>:<timestamp>`.
pub fn occurrence_key(event_type: &str, starts_at: DateTime<Utc>) -> String {
    format!("{}:{}", event_type, format_timestamp(starts_at))
}

/// Extract the timestamp embedded after the first `:` of a key.
///
/// Accepts RFC 3339 and ISO-8601 without an offset (read as UTC). Returns
/// `None` for keys without a separator or with an unparseable timestamp.
pub fn parse_key_timestamp(key: &str) -> Option<DateTime<Utc>> {
    let (_, ts) = key.split_once(':')?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_uses_type_and_rfc3339() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 18, 0, 0).unwrap();
        let occ = Occurrence::new("ruins", ts);
        assert_eq!(occ.key, "ruins:2025-02-03T18:00:00Z");
    }

    #[test]
    fn key_timestamp_roundtrips() {
        let ts = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0).unwrap();
        let key = occurrence_key("altar", ts);
        assert_eq!(parse_key_timestamp(&key), Some(ts));
    }

    #[test]
    fn key_timestamp_without_offset_reads_as_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 18, 0, 0).unwrap();
        assert_eq!(parse_key_timestamp("ruins:2025-02-03T18:00:00"), Some(ts));
        assert_eq!(parse_key_timestamp("ruins:2025-02-03T19:00:00+01:00"), Some(ts));
    }

    #[test]
    fn malformed_key_timestamp_is_none() {
        assert_eq!(parse_key_timestamp("ruins:not-a-date"), None);
        assert_eq!(parse_key_timestamp("no-separator"), None);
    }

    #[test]
    fn seconds_until_has_millisecond_precision() {
        let starts = Utc.with_ymd_and_hms(2025, 2, 3, 18, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 2, 3, 17, 0, 5).unwrap()
            + chrono::Duration::milliseconds(50);
        let occ = Occurrence::new("ruins", starts);
        assert!((occ.seconds_until(now) - 3594.95).abs() < 1e-9);
    }

    #[test]
    fn source_from_str() {
        let src: ScheduleSource = "ruins = ruins.txt".parse().unwrap();
        assert_eq!(src.event_type, "ruins");
        assert_eq!(src.path, PathBuf::from("ruins.txt"));

        assert!("ruins".parse::<ScheduleSource>().is_err());
        assert!("=ruins.txt".parse::<ScheduleSource>().is_err());
        assert!("a:b=x.txt".parse::<ScheduleSource>().is_err());
    }

    #[test]
    fn source_resolves_relative_paths_only() {
        let dir = Path::new("/srv/schedules");
        let rel = ScheduleSource::new("ruins", "ruins.txt").resolved_in(dir);
        assert_eq!(rel.path, PathBuf::from("/srv/schedules/ruins.txt"));

        let abs = ScheduleSource::new("altar", "/etc/altar.txt").resolved_in(dir);
        assert_eq!(abs.path, PathBuf::from("/etc/altar.txt"));
    }

    #[test]
    fn tuple_display_and_from_datetime() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 8, 5, 0).unwrap();
        let tuple = CalendarTuple::from(ts);
        assert_eq!(tuple, CalendarTuple::new(3, 2, 8, 5));
        assert_eq!(tuple.to_string(), "3.2. 8:05");
    }
}
