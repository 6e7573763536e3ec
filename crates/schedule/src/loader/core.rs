//! Core [`ScheduleLoader`] struct: filesystem-backed schedule loading.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use herald_core::{Occurrence, ScheduleSource};

use crate::parser::{is_comment_or_blank, parse_line};
use crate::resolver::resolve;

use super::error::SourceReport;

/// Result of one full schedule load.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// All sources merged, ascending by `starts_at`.
    pub occurrences: Vec<Occurrence>,
    /// One report per configured source, in configuration order.
    pub reports: Vec<SourceReport>,
}

/// Filesystem-backed schedule loader.
///
/// Holds the configured sources and resolves them against a caller-supplied
/// "now" on every [`load`](ScheduleLoader::load). The loader keeps no
/// occurrence state of its own; callers replace their list wholesale with
/// each outcome.
pub struct ScheduleLoader {
    /// Directory containing the schedule files.
    schedule_dir: PathBuf,
    /// Configured sources with paths already resolved.
    sources: Vec<ScheduleSource>,
    /// Year-rollover grace window.
    near_past_slack: Duration,
}

impl ScheduleLoader {
    /// Create a new loader for the given directory and sources.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(schedule_dir: PathBuf, sources: Vec<ScheduleSource>, near_past_slack: Duration) -> Self {
        if !schedule_dir.exists() {
            if let Err(e) = fs::create_dir_all(&schedule_dir) {
                warn!(path = %schedule_dir.display(), error = %e, "failed to create schedule directory");
            }
        }
        Self {
            schedule_dir,
            sources,
            near_past_slack,
        }
    }

    /// Load every source and merge the results.
    ///
    /// Sorting is stable, so occurrences sharing a start time keep source
    /// order and repeated loads with the same inputs are identical.
    pub fn load(&self, now: DateTime<Utc>) -> LoadOutcome {
        let mut occurrences = Vec::new();
        let mut reports = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let (mut occs, report) = self.load_source(source, now);
            occurrences.append(&mut occs);
            reports.push(report);
        }

        occurrences.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));

        info!(
            sources = self.sources.len(),
            occurrences = occurrences.len(),
            "schedule loaded"
        );

        LoadOutcome {
            occurrences,
            reports,
        }
    }

    /// Load a single source.
    ///
    /// A missing or unreadable file yields zero occurrences. Duplicate keys
    /// within the file collapse to the first one.
    pub fn load_source(&self, source: &ScheduleSource, now: DateTime<Utc>) -> (Vec<Occurrence>, SourceReport) {
        let mut report = SourceReport::empty(&source.event_type, source.path.clone());

        let contents = match fs::read(&source.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(event_type = %source.event_type, path = %source.path.display(), "schedule file missing, treating as empty");
                report.missing = true;
                return (Vec::new(), report);
            }
            Err(e) => {
                warn!(event_type = %source.event_type, path = %source.path.display(), error = %e, "failed to read schedule file");
                report.read_error = Some(e.to_string());
                return (Vec::new(), report);
            }
        };

        let mut seen = HashSet::new();
        let mut occurrences = Vec::new();

        for (idx, line) in contents.lines().enumerate() {
            if is_comment_or_blank(line) {
                continue;
            }

            let resolved = parse_line(line).and_then(|tuple| resolve(&tuple, now, self.near_past_slack));
            let Some(starts_at) = resolved else {
                debug!(event_type = %source.event_type, line = idx + 1, text = %line.trim(), "skipping unparseable schedule line");
                report.skipped += 1;
                report.skipped_lines.push(idx + 1);
                continue;
            };

            let occurrence = Occurrence::new(&source.event_type, starts_at);
            if !seen.insert(occurrence.key.clone()) {
                report.duplicates += 1;
                continue;
            }
            occurrences.push(occurrence);
        }

        report.parsed = occurrences.len();
        debug!(
            event_type = %source.event_type,
            parsed = report.parsed,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "loaded schedule source"
        );

        (occurrences, report)
    }

    /// Get the schedule directory path.
    pub fn schedule_dir(&self) -> &Path {
        &self.schedule_dir
    }

    /// Get the configured sources.
    pub fn sources(&self) -> &[ScheduleSource] {
        &self.sources
    }
}
