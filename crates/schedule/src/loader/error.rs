//! Error types and per-source load reports for the schedule loader.

use std::path::PathBuf;

/// Errors that can occur while setting up schedule loading.
///
/// Reading schedule files never fails a load: unreadable or missing files
/// contribute zero occurrences and are described by their [`SourceReport`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Outcome of loading a single schedule source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub event_type: String,
    pub path: PathBuf,
    /// Lines that produced an occurrence (after dedup).
    pub parsed: usize,
    /// Lines resolving to a key already seen in this source.
    pub duplicates: usize,
    /// Non-blank, non-comment lines that did not parse or resolve.
    pub skipped: usize,
    /// 1-based line numbers of the skipped lines.
    pub skipped_lines: Vec<usize>,
    /// The file did not exist.
    pub missing: bool,
    /// The file existed but could not be read.
    pub read_error: Option<String>,
}

impl SourceReport {
    pub(super) fn empty(event_type: &str, path: PathBuf) -> Self {
        Self {
            event_type: event_type.to_string(),
            path,
            parsed: 0,
            duplicates: 0,
            skipped: 0,
            skipped_lines: Vec::new(),
            missing: false,
            read_error: None,
        }
    }
}
