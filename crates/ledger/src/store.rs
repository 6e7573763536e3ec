//! JSON-file-backed [`NotificationLedger`].

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use herald_core::parse_key_timestamp;

use crate::error::{LedgerError, Result};

/// Set of occurrence keys that have already been announced.
///
/// The on-disk form is a JSON object mapping each key to `true`. The whole
/// file is rewritten on every mutation; this process is the only writer.
#[derive(Debug)]
pub struct NotificationLedger {
    path: PathBuf,
    keys: BTreeSet<String>,
}

impl NotificationLedger {
    /// Load the ledger stored at `path`.
    ///
    /// Returns an empty ledger if the file doesn't exist or is corrupted.
    /// Entries whose marker is `false` or `null` are not considered notified.
    pub fn open(path: PathBuf) -> Self {
        let keys = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => map
                    .into_iter()
                    .filter(|(_, v)| !matches!(v, Value::Bool(false) | Value::Null))
                    .map(|(k, _)| k)
                    .collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ledger is corrupted, starting empty");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no ledger found, starting empty");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger is unreadable, starting empty");
                BTreeSet::new()
            }
        };

        debug!(path = %path.display(), entries = keys.len(), "ledger opened");
        Self { path, keys }
    }

    /// Whether a reminder was already sent for `key`.
    pub fn is_notified(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record `key` as notified and persist immediately.
    ///
    /// The in-memory mark is kept even when the write fails, so the running
    /// process never announces the key twice; only a restart before the next
    /// successful write could.
    pub fn mark_notified(&mut self, key: &str) -> Result<()> {
        if self.keys.insert(key.to_string()) {
            debug!(key = %key, "marked notified");
        }
        self.save()
    }

    /// Drop entries whose embedded timestamp is strictly older than
    /// `now - retention_days`. Keys without a parseable timestamp are kept.
    ///
    /// Returns the number of entries removed. Does not persist; call
    /// [`save`](Self::save) afterwards.
    pub fn prune(&mut self, now: DateTime<Utc>, retention_days: u32) -> usize {
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let before = self.keys.len();
        self.keys.retain(|key| match parse_key_timestamp(key) {
            Some(ts) => ts >= cutoff,
            None => true,
        });
        let removed = before - self.keys.len();
        if removed > 0 {
            info!(removed, remaining = self.keys.len(), "pruned stale ledger entries");
        }
        removed
    }

    /// Atomically write the whole ledger to disk.
    ///
    /// Writes to a dot-prefixed `.tmp` sibling first, then renames over the
    /// final path. Parent directories are created as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let map: Map<String, Value> = self
            .keys
            .iter()
            .map(|k| (k.clone(), Value::Bool(true)))
            .collect();
        let json = serde_json::to_string_pretty(&map)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(|source| LedgerError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All notified keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of notified keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
