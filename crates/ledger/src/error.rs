//! Error types for ledger persistence.

use std::path::PathBuf;

/// Errors that can occur while persisting the ledger.
///
/// Loading never fails: an absent or corrupt store starts an empty ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Filesystem I/O error while writing the store.
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
