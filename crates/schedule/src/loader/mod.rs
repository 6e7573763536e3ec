//! Filesystem schedule loader with hot-reload via `notify` watcher.
//!
//! Reads every configured schedule file, resolves its lines to occurrences,
//! deduplicates per source, and merges everything into one time-sorted list.
//! The watcher never reloads by itself: it sends a [`ReloadRequest`] to
//! whoever owns the occurrence list.

mod core;
mod error;
mod watcher;


pub use self::core::{LoadOutcome, ScheduleLoader};
pub use self::error::{LoadError, Result, SourceReport};
pub use self::watcher::{ReloadRequest, ScheduleWatcher};
