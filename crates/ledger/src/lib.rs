//! Persisted notification ledger.
//!
//! Records which occurrence keys already produced a reminder so that each
//! occurrence is announced at most once, across restarts. Entries older than
//! the retention horizon are pruned so the store stays bounded.

mod error;
mod store;

pub use error::{LedgerError, Result};
pub use store::NotificationLedger;
