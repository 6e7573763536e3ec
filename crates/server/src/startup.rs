//! Daemon wiring: delivery channel, scheduler context, watcher, health server.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tracing::{error, info, warn};

use herald_core::Config;
use herald_ledger::NotificationLedger;
use herald_notify::{DiscordNotifier, Notifier, ReminderRenderer, WebhookNotifier};
use herald_schedule::{ReloadRequest, ScheduleLoader, SourceReport};
use herald_trigger::{FiringWindow, PollLoop, SchedulerContext};

use crate::health;

/// Build the delivery collaborator selected by `DELIVERY_CHANNEL`.
pub fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    let url = config
        .delivery
        .webhook_url
        .clone()
        .context("DISCORD_WEBHOOK_URL must be set")?;
    let timeout = config.delivery.send_timeout();
    let notifier: Arc<dyn Notifier> = match config.delivery.channel.as_str() {
        "webhook" => Arc::new(WebhookNotifier::new(&url, &[])?.with_timeout(timeout)?),
        _ => Arc::new(DiscordNotifier::from_config(url)?.with_timeout(timeout)?),
    };
    Ok(notifier)
}

fn log_reports(reports: &[SourceReport]) {
    for r in reports {
        if r.missing {
            warn!(event_type = %r.event_type, path = %r.path.display(), "schedule file missing, no occurrences");
        } else if let Some(err) = &r.read_error {
            warn!(event_type = %r.event_type, path = %r.path.display(), error = %err, "schedule file unreadable");
        } else {
            info!(
                event_type = %r.event_type,
                parsed = r.parsed,
                duplicates = r.duplicates,
                skipped = r.skipped,
                "schedule source loaded"
            );
        }
    }
}

/// Run the reminder daemon until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let notifier = build_notifier(&config)?;
    let renderer =
        ReminderRenderer::new(config.delivery.template.as_deref()).context("invalid REMINDER_TEMPLATE")?;

    let loader = ScheduleLoader::new(
        config.schedule.dir.clone(),
        config.schedule.sources()?,
        config.timing.near_past_slack(),
    );

    let (reload_tx, reload_rx) = mpsc::channel::<ReloadRequest>(1);
    let _watcher = if config.schedule.watch {
        match loader.watch(reload_tx.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(error = %e, "failed to start schedule watcher, changes need a manual reload");
                None
            }
        }
    } else {
        None
    };

    let ledger = NotificationLedger::open(config.ledger.path.clone());
    let mut ctx = SchedulerContext::new(loader, ledger, notifier, renderer)
        .with_window(FiringWindow::from(&config.timing))
        .with_retention_days(config.ledger.retention_days)
        .with_mention(config.delivery.mention.clone());

    let reports = ctx
        .reload(Utc::now())
        .with_context(|| format!("ledger at {} is not writable", config.ledger.path.display()))?;
    log_reports(&reports);

    let shutdown = Arc::new(Notify::new());
    let poll = PollLoop::new(ctx, config.timing.poll_interval(), reload_rx, shutdown.clone());

    let addr = format!("{}:{}", config.health.host, config.health.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind health endpoint on {addr}"))?;
    info!("Health endpoint listening on http://{}/health", addr);
    let app = health::router(poll.status());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "health server stopped");
        }
    });

    spawn_signal_handlers(shutdown.clone(), reload_tx);

    let ctx = poll.run().await;
    info!(notified = ctx.ledger().len(), "herald stopped");
    Ok(())
}

/// Ctrl-C stops the loop; on Unix, SIGHUP requests a manual reload.
fn spawn_signal_handlers(shutdown: Arc<Notify>, reload_tx: mpsc::Sender<ReloadRequest>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        shutdown.notify_one();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "SIGHUP reload unavailable");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            if reload_tx.send(ReloadRequest::Manual).await.is_err() {
                break;
            }
        }
    });

    #[cfg(not(unix))]
    drop(reload_tx);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(channel: &str, url: Option<&str>) -> Config {
        let mut config = Config::for_profile("HERALD_STARTUP_TEST");
        config.delivery.channel = channel.to_string();
        config.delivery.webhook_url = url.map(String::from);
        config
    }

    #[test]
    fn discord_channel_builds_discord_notifier() {
        let notifier = build_notifier(&config_with("discord", Some("https://discord.com/api/webhooks/1/x"))).unwrap();
        assert_eq!(notifier.channel_name(), "discord");
    }

    #[test]
    fn webhook_channel_builds_generic_notifier() {
        let notifier = build_notifier(&config_with("webhook", Some("https://hooks.example/remind"))).unwrap();
        assert_eq!(notifier.channel_name(), "webhook");
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(build_notifier(&config_with("discord", None)).is_err());
    }
}
