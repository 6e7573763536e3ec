//! Schedule ingestion for herald.
//!
//! This crate provides:
//! - Line parser turning `D.M. H:MM` schedule lines into calendar tuples
//! - Occurrence resolver applying the year-rollover rule
//! - Filesystem loader merging per-type schedule files, with a `notify` watcher
//! - Read-only queries over the resolved occurrence list

pub mod loader;
pub mod parser;
pub mod query;
pub mod resolver;

pub use loader::{LoadError, LoadOutcome, ReloadRequest, ScheduleLoader, ScheduleWatcher, SourceReport};
pub use parser::parse_line;
pub use resolver::resolve;
