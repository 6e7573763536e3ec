//! Line parser: one raw schedule line to an optional [`CalendarTuple`].
//!
//! Accepted shape after normalization is `D.M. H:MM`, optionally preceded by
//! a decorative weekday abbreviation (`"Mon, 3.2. 18:00"`). Anything else,
//! including blank lines and `#` comments, is skipped without error.

use std::sync::LazyLock;

use herald_core::CalendarTuple;
use regex::Regex;

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static RE_WEEKDAY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{3}(?:, ?| )").expect("valid weekday regex"));
static RE_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\. (\d{1,2}):(\d{2})\b").expect("valid date-time regex")
});

/// Trim, collapse whitespace runs, and drop a leading weekday abbreviation.
pub fn normalize_line(raw: &str) -> String {
    let collapsed = RE_WHITESPACE.replace_all(raw.trim(), " ");
    RE_WEEKDAY_PREFIX.replace(&collapsed, "").into_owned()
}

/// Blank lines and `#` comments carry no schedule data and are not
/// reported as skipped.
pub fn is_comment_or_blank(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse one schedule line.
///
/// Returns `None` for blank lines, comments, and lines without a
/// `D.M. H:MM` token. The first token found on the line wins.
pub fn parse_line(raw: &str) -> Option<CalendarTuple> {
    if is_comment_or_blank(raw) {
        return None;
    }

    let normalized = normalize_line(raw);
    let caps = RE_DATE_TIME.captures(&normalized)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    Some(CalendarTuple::new(field(1)?, field(2)?, field(3)?, field(4)?))
}
