//! The poll loop: fixed-cadence ticks and reload requests on one task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use herald_schedule::ReloadRequest;

use crate::context::{SchedulerContext, TickSummary};

/// Snapshot of the loop's progress, published after every tick and reload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopStatus {
    pub occurrences: usize,
    pub notified: usize,
    pub next_key: Option<String>,
    pub last_tick: Option<DateTime<Utc>>,
    pub last_reload: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub failed_ticks: u64,
    pub reminders_sent: u64,
    pub last_summary: TickSummary,
}

pub type SharedStatus = Arc<RwLock<LoopStatus>>;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives a [`SchedulerContext`] until shutdown.
///
/// Ticks, reloads and shutdown are multiplexed in a single `select!`; each
/// branch runs to completion before the next is polled, so a slow delivery
/// delays the following tick instead of overlapping it.
pub struct PollLoop {
    ctx: SchedulerContext,
    interval: Duration,
    reload_rx: mpsc::Receiver<ReloadRequest>,
    shutdown: Arc<Notify>,
    status: SharedStatus,
    clock: Clock,
}

impl PollLoop {
    pub fn new(
        ctx: SchedulerContext,
        interval: Duration,
        reload_rx: mpsc::Receiver<ReloadRequest>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            ctx,
            interval,
            reload_rx,
            shutdown,
            status: SharedStatus::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Handle for read-only observers such as the health endpoint.
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Run until `shutdown` is notified, then hand the context back.
    pub async fn run(mut self) -> SchedulerContext {
        info!(interval_secs = self.interval.as_secs_f64(), "poll loop started");
        self.publish(None).await;

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reloads_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("poll loop shutting down");
                    break;
                }
                req = self.reload_rx.recv(), if reloads_open => match req {
                    Some(req) => self.handle_reload(req).await,
                    None => {
                        debug!("reload channel closed");
                        reloads_open = false;
                    }
                },
                _ = interval.tick() => self.handle_tick().await,
            }
        }

        self.ctx
    }

    async fn handle_reload(&mut self, req: ReloadRequest) {
        let now = (self.clock)();
        match &req {
            ReloadRequest::FileChanged(path) => info!(path = %path.display(), "reloading schedules"),
            ReloadRequest::Manual => info!("reloading schedules on request"),
        }
        if let Err(e) = self.ctx.reload(now) {
            error!(error = %e, "schedule reload failed to persist ledger");
        }
        {
            let mut status = self.status.write().await;
            status.last_reload = Some(now);
        }
        self.publish(None).await;
    }

    async fn handle_tick(&mut self) {
        let now = (self.clock)();
        let outcome = self.ctx.tick(now).await;

        match &outcome {
            Ok(summary) if summary.due > 0 => info!(
                due = summary.due,
                sent = summary.sent,
                failed = summary.failed,
                "tick delivered reminders"
            ),
            Ok(_) => debug!(at = %now, "tick: nothing due"),
            Err(e) => error!(error = %e, "tick failed"),
        }

        {
            let mut status = self.status.write().await;
            status.ticks += 1;
            status.last_tick = Some(now);
            match &outcome {
                Ok(summary) => {
                    status.reminders_sent += summary.sent as u64;
                    status.last_summary = *summary;
                }
                Err(_) => status.failed_ticks += 1,
            }
        }
        self.publish(Some(now)).await;
    }

    async fn publish(&self, now: Option<DateTime<Utc>>) {
        let now = now.unwrap_or_else(|| (self.clock)());
        let next_key = herald_schedule::query::next_at_or_after(self.ctx.occurrences(), now).map(|o| o.key.clone());
        let mut status = self.status.write().await;
        status.occurrences = self.ctx.occurrences().len();
        status.notified = self.ctx.ledger().len();
        status.next_key = next_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use herald_core::ScheduleSource;
    use herald_ledger::NotificationLedger;
    use herald_notify::{Notification, Notifier, NotifyError, ReminderRenderer};
    use herald_schedule::ScheduleLoader;
    use tempfile::TempDir;

    struct MockNotifier {
        send_count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            // Slower than the tick interval, so overlapping ticks would double-send.
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.send_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "mock"
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 17, 0, 0).unwrap()
    }

    fn context(dir: &TempDir, ledger_path: std::path::PathBuf, count: Arc<AtomicUsize>) -> SchedulerContext {
        let path = dir.path().join("ruins.txt");
        let loader = ScheduleLoader::new(
            dir.path().to_path_buf(),
            vec![ScheduleSource::new("ruins", path)],
            chrono::Duration::minutes(5),
        );
        let ledger = NotificationLedger::open(ledger_path);
        let notifier = Arc::new(MockNotifier { send_count: count });
        SchedulerContext::new(loader, ledger, notifier, ReminderRenderer::new(None).unwrap())
    }

    fn build(dir: &TempDir, count: Arc<AtomicUsize>) -> (PollLoop, mpsc::Sender<ReloadRequest>, Arc<Notify>) {
        let mut ctx = context(dir, dir.path().join("notified.json"), count);
        ctx.reload(fixed_now()).unwrap();
        poll_over(ctx)
    }

    fn poll_over(ctx: SchedulerContext) -> (PollLoop, mpsc::Sender<ReloadRequest>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(1);
        let shutdown = Arc::new(Notify::new());
        let poll = PollLoop::new(ctx, Duration::from_millis(5), rx, shutdown.clone()).with_clock(fixed_now);
        (poll, tx, shutdown)
    }

    async fn wait_for(status: &SharedStatus, pred: impl Fn(&LoopStatus) -> bool) {
        for _ in 0..400 {
            if pred(&*status.read().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached: {:?}", status.read().await);
    }

    #[tokio::test]
    async fn repeated_ticks_send_exactly_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (poll, _tx, shutdown) = build(&dir, count.clone());
        let status = poll.status();

        let handle = tokio::spawn(poll.run());
        wait_for(&status, |s| s.ticks >= 5).await;
        shutdown.notify_one();
        let ctx = handle.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(ctx.ledger().is_notified("ruins:2025-02-03T18:00:00Z"));
        let status = status.read().await;
        assert_eq!(status.reminders_sent, 1);
        assert_eq!(status.failed_ticks, 0);
    }

    #[tokio::test]
    async fn reload_request_picks_up_new_schedule() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ruins.txt"), "# nothing yet\n").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (poll, tx, shutdown) = build(&dir, count.clone());
        let status = poll.status();

        let handle = tokio::spawn(poll.run());
        wait_for(&status, |s| s.ticks >= 1).await;
        assert_eq!(status.read().await.occurrences, 0);

        fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n10.2. 18:00\n").unwrap();
        tx.send(ReloadRequest::Manual).await.unwrap();
        wait_for(&status, |s| s.last_reload.is_some() && s.reminders_sent == 1).await;

        shutdown.notify_one();
        let ctx = handle.await.unwrap();
        assert_eq!(ctx.occurrences().len(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(status.read().await.next_key.as_deref(), Some("ruins:2025-02-03T18:00:00Z"));
    }

    #[tokio::test]
    async fn failing_tick_is_counted_and_loop_keeps_ticking() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n").unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let mut ctx = context(&dir, blocker.join("notified.json"), count.clone());
        assert!(ctx.reload(fixed_now()).is_err());
        let (poll, _tx, shutdown) = poll_over(ctx);
        let status = poll.status();

        let handle = tokio::spawn(poll.run());
        wait_for(&status, |s| s.failed_ticks >= 1).await;
        let ticks_after_failure = status.read().await.ticks;
        wait_for(&status, |s| s.ticks >= ticks_after_failure + 3).await;
        shutdown.notify_one();
        let ctx = handle.await.unwrap();

        let status = status.read().await;
        assert_eq!(status.failed_ticks, 1);
        assert_eq!(status.reminders_sent, 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(ctx.ledger().is_notified("ruins:2025-02-03T18:00:00Z"));
    }

    #[tokio::test]
    async fn closed_reload_channel_does_not_stop_ticking() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ruins.txt"), "3.2. 18:00\n").unwrap();
        let (poll, tx, shutdown) = build(&dir, Arc::new(AtomicUsize::new(0)));
        let status = poll.status();
        drop(tx);

        let handle = tokio::spawn(poll.run());
        wait_for(&status, |s| s.ticks >= 3).await;
        shutdown.notify_one();
        handle.await.unwrap();
    }
}
