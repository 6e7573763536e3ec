//! Filesystem watcher turning schedule file changes into reload requests.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::core::ScheduleLoader;
use super::error::Result;

/// Why the occurrence list should be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadRequest {
    /// A watched schedule file was created, modified, or removed.
    FileChanged(PathBuf),
    /// Requested by an operator or another component.
    Manual,
}

/// Keeps the underlying `notify` watcher alive; dropping it stops watching.
pub struct ScheduleWatcher {
    _watcher: RecommendedWatcher,
}

impl ScheduleLoader {
    /// Watch the directories holding the configured sources.
    ///
    /// Relevant changes are forwarded as [`ReloadRequest::FileChanged`] with
    /// `try_send`, so a burst of events while a reload is already queued
    /// collapses into that one pending request.
    pub fn watch(&self, tx: mpsc::Sender<ReloadRequest>) -> Result<ScheduleWatcher> {
        let file_names: HashSet<OsString> = self
            .sources()
            .iter()
            .filter_map(|s| s.path.file_name().map(|n| n.to_os_string()))
            .collect();

        let mut dirs: HashSet<PathBuf> = self
            .sources()
            .iter()
            .filter_map(|s| s.path.parent().map(|p| p.to_path_buf()))
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if dirs.is_empty() {
            dirs.insert(self.schedule_dir().to_path_buf());
        }

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => handle_fs_event(&event, &file_names, &tx),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })?;

        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!(path = %dir.display(), "watching schedule directory for changes");
        }

        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        Ok(ScheduleWatcher { _watcher: watcher })
    }
}

/// Forward a single filesystem event if it touches a configured schedule file.
pub(super) fn handle_fs_event(event: &Event, file_names: &HashSet<OsString>, tx: &mpsc::Sender<ReloadRequest>) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    let Some(path) = event
        .paths
        .iter()
        .find(|p| p.file_name().is_some_and(|n| file_names.contains(n)))
    else {
        return;
    };

    match tx.try_send(ReloadRequest::FileChanged(path.clone())) {
        Ok(()) => info!(path = %path.display(), "schedule file changed, reload requested"),
        Err(TrySendError::Full(_)) => debug!(path = %path.display(), "reload already pending"),
        Err(TrySendError::Closed(_)) => debug!("reload channel closed, ignoring change"),
    }
}
