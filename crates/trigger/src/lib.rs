//! Reminder triggering for herald.
//!
//! - [`evaluator`] decides which occurrences are inside the firing window
//! - [`SchedulerContext`] owns the occurrence list, ledger and notifier
//! - [`PollLoop`] drives ticks and reloads strictly one at a time

pub mod context;
pub mod error;
pub mod evaluator;
pub mod poll;

pub use context::{SchedulerContext, TickSummary};
pub use error::{Result, TriggerError};
pub use evaluator::{due_occurrences, FiringWindow};
pub use poll::{LoopStatus, PollLoop, SharedStatus};
