//! [`SchedulerContext`]: the single owner of mutable scheduling state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use herald_core::config::DEFAULT_RETENTION_DAYS;
use herald_core::Occurrence;
use herald_ledger::NotificationLedger;
use herald_notify::{Notification, Notifier, ReminderContext, ReminderRenderer};
use herald_schedule::{ScheduleLoader, SourceReport};

use crate::error::Result;
use crate::evaluator::{due_occurrences, FiringWindow};

/// Outcome of one evaluation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Occurrences inside the window and not yet notified.
    pub due: usize,
    /// Reminders delivered and recorded in the ledger.
    pub sent: usize,
    /// Deliveries that failed; these stay eligible for the next tick.
    pub failed: usize,
}

/// Occurrence list, ledger and delivery collaborator, owned together.
///
/// Every mutation goes through `&mut self`, so whoever holds the context
/// (the poll loop) is the only place reloads and ticks can happen, and they
/// can never interleave.
pub struct SchedulerContext {
    loader: ScheduleLoader,
    ledger: NotificationLedger,
    occurrences: Vec<Occurrence>,
    notifier: Arc<dyn Notifier>,
    renderer: ReminderRenderer,
    window: FiringWindow,
    retention_days: u32,
    mention: Option<String>,
}

impl SchedulerContext {
    /// Create a context with an empty occurrence list; call
    /// [`reload`](Self::reload) before the first tick.
    pub fn new(
        loader: ScheduleLoader,
        ledger: NotificationLedger,
        notifier: Arc<dyn Notifier>,
        renderer: ReminderRenderer,
    ) -> Self {
        Self {
            loader,
            ledger,
            occurrences: Vec::new(),
            notifier,
            renderer,
            window: FiringWindow::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
            mention: None,
        }
    }

    pub fn with_window(mut self, window: FiringWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_mention(mut self, mention: Option<String>) -> Self {
        self.mention = mention;
        self
    }

    /// Rebuild the occurrence list from the schedule files, then prune and
    /// persist the ledger.
    ///
    /// The occurrence list is replaced even if persisting the pruned ledger
    /// fails.
    pub fn reload(&mut self, now: DateTime<Utc>) -> Result<Vec<SourceReport>> {
        let outcome = self.loader.load(now);
        self.occurrences = outcome.occurrences;

        for report in outcome.reports.iter().filter(|r| r.skipped > 0) {
            debug!(
                event_type = %report.event_type,
                skipped = report.skipped,
                lines = ?report.skipped_lines,
                "schedule lines skipped"
            );
        }

        let pruned = self.ledger.prune(now, self.retention_days);
        self.ledger.save()?;

        info!(
            occurrences = self.occurrences.len(),
            notified = self.ledger.len(),
            pruned,
            "schedule reloaded"
        );
        Ok(outcome.reports)
    }

    /// Evaluate the window at `now` and deliver every due reminder.
    ///
    /// A key is marked in the ledger only after its delivery succeeded, so
    /// a failed send is retried on the next tick while the occurrence is
    /// still inside the window. Delivery failures are logged and counted;
    /// a ledger write failure aborts the tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickSummary> {
        let due: Vec<Occurrence> = due_occurrences(&self.occurrences, &self.ledger, now, self.window)
            .into_iter()
            .cloned()
            .collect();

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };

        for occ in &due {
            let ctx = ReminderContext::new(&occ.event_type, &occ.key, occ.starts_at, now, self.mention.as_deref());
            let text = match self.renderer.render(&ctx) {
                Ok(text) => text,
                Err(e) => {
                    warn!(key = %occ.key, error = %e, "failed to render reminder");
                    summary.failed += 1;
                    continue;
                }
            };

            let notification = Notification::new(text)
                .with_metadata("key", occ.key.clone())
                .with_metadata("type", occ.event_type.clone());

            match self.notifier.send(&notification).await {
                Ok(()) => {
                    self.ledger.mark_notified(&occ.key)?;
                    summary.sent += 1;
                    info!(
                        key = %occ.key,
                        channel = self.notifier.channel_name(),
                        seconds_until = occ.seconds_until(now),
                        "reminder sent"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        key = %occ.key,
                        channel = self.notifier.channel_name(),
                        error = %e,
                        "reminder delivery failed, will retry while inside the window"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Current occurrence list, ascending by start time.
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    pub fn window(&self) -> FiringWindow {
        self.window
    }
}
