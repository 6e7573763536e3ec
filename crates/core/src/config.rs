use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, Result};
use crate::occurrence::ScheduleSource;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

// ── Defaults ──────────────────────────────────────────────────

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_WINDOW_LOWER_SECS: i64 = 3570;
pub const DEFAULT_WINDOW_UPPER_SECS: i64 = 3630;
pub const DEFAULT_RETENTION_DAYS: u32 = 14;
pub const DEFAULT_NEAR_PAST_SLACK_SECS: i64 = 300;
pub const DEFAULT_SOURCES: &str = "ruins=ruins.txt,altar=altar.txt";
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

// ── Bounds ────────────────────────────────────────────────────

/// Upper bound for firing-window edges: one year ahead.
pub const MAX_WINDOW_SECS: i64 = 366 * 86_400;
pub const MAX_NEAR_PAST_SLACK_SECS: i64 = 86_400;
pub const MAX_RETENTION_DAYS: u32 = 3_650;

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub schedule: ScheduleConfig,
    pub ledger: LedgerConfig,
    pub delivery: DeliveryConfig,
    pub timing: TimingConfig,
    pub health: HealthConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `HERALD_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("HERALD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            schedule: ScheduleConfig::from_env_profiled(p),
            ledger: LedgerConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
            timing: TimingConfig::from_env_profiled(p),
            health: HealthConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check everything the daemon needs before it may start.
    ///
    /// Read-only commands only need [`ScheduleConfig::sources`] to succeed;
    /// this additionally requires a delivery destination.
    pub fn validate(&self) -> Result<()> {
        if self.delivery.webhook_url.is_none() {
            return Err(HeraldError::Config(
                "DISCORD_WEBHOOK_URL must be set".to_string(),
            ));
        }
        if !matches!(self.delivery.channel.as_str(), "discord" | "webhook") {
            return Err(HeraldError::Config(format!(
                "DELIVERY_CHANNEL must be 'discord' or 'webhook', got '{}'",
                self.delivery.channel
            )));
        }
        if self.ledger.retention_days == 0 || self.ledger.retention_days > MAX_RETENTION_DAYS {
            return Err(HeraldError::Config(format!(
                "RETENTION_DAYS must be within 1..={MAX_RETENTION_DAYS}, got {}",
                self.ledger.retention_days
            )));
        }
        if self.delivery.send_timeout_secs == 0 {
            return Err(HeraldError::Config("SEND_TIMEOUT_SECS must be > 0".to_string()));
        }
        if self.schedule.sources()?.is_empty() {
            return Err(HeraldError::Config(
                "SCHEDULE_SOURCES must name at least one source".to_string(),
            ));
        }
        self.timing.validate()
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  schedule:  dir={}, sources={}, watch={}", self.schedule.dir.display(), self.schedule.sources_raw, self.schedule.watch);
        tracing::info!("  ledger:    path={}, retention_days={}", self.ledger.path.display(), self.ledger.retention_days);
        tracing::info!("  delivery:  channel={}, webhook={}, mention={}, timeout={}s", self.delivery.channel, self.delivery.redacted_webhook(), self.delivery.mention.as_deref().unwrap_or("(none)"), self.delivery.send_timeout_secs);
        tracing::info!(
            "  timing:    poll={}s, window=[{}s, {}s], slack={}s",
            self.timing.poll_interval_secs,
            self.timing.window_lower_secs,
            self.timing.window_upper_secs,
            self.timing.near_past_slack_secs
        );
        tracing::info!("  health:    {}:{}", self.health.host, self.health.port);
    }
}

// ── Schedule sources ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub dir: PathBuf,
    /// Comma-separated `type=file` pairs, files relative to `dir`.
    pub sources_raw: String,
    /// Reload automatically when a schedule file changes.
    pub watch: bool,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "SCHEDULE_DIR", "data/schedules")),
            sources_raw: profiled_env_or(p, "SCHEDULE_SOURCES", DEFAULT_SOURCES),
            watch: profiled_env_bool(p, "WATCH_SCHEDULES", true),
        }
    }

    /// Parse the configured sources, resolving file paths against `dir`.
    pub fn sources(&self) -> Result<Vec<ScheduleSource>> {
        self.sources_raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<ScheduleSource>().map(|src| src.resolved_in(&self.dir)))
            .collect()
    }
}

// ── Ledger ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub retention_days: u32,
}

impl LedgerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            path: PathBuf::from(profiled_env_or(p, "LEDGER_PATH", "data/notified.json")),
            retention_days: profiled_env_parse(p, "RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
        }
    }
}

// ── Delivery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// `discord` (Discord webhook payload) or `webhook` (generic JSON POST).
    pub channel: String,
    pub webhook_url: Option<String>,
    /// Prefix placed in front of every reminder, e.g. a role mention.
    pub mention: Option<String>,
    /// Minijinja template overriding the built-in reminder text.
    pub template: Option<String>,
    /// Comma-separated actors allowed to run operator commands.
    pub admin_actors: String,
    /// Upper bound on a single delivery attempt.
    pub send_timeout_secs: u64,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            channel: profiled_env_or(p, "DELIVERY_CHANNEL", "discord").to_lowercase(),
            webhook_url: profiled_env_opt(p, "DISCORD_WEBHOOK_URL"),
            mention: profiled_env_opt(p, "REMINDER_MENTION"),
            template: profiled_env_opt(p, "REMINDER_TEMPLATE"),
            admin_actors: profiled_env_or(p, "ADMIN_ACTORS", ""),
            send_timeout_secs: profiled_env_parse(p, "SEND_TIMEOUT_SECS", DEFAULT_SEND_TIMEOUT_SECS),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Webhook URL reduced to scheme and host; the token path is never logged.
    pub fn redacted_webhook(&self) -> String {
        match &self.webhook_url {
            Some(url) => {
                let base: Vec<&str> = url.splitn(4, '/').take(3).collect();
                format!("{}/***", base.join("/"))
            }
            None => "(none)".to_string(),
        }
    }
}

// ── Timing ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub poll_interval_secs: u64,
    /// Fire when at most this many seconds remain before the start...
    pub window_upper_secs: i64,
    /// ...and at least this many.
    pub window_lower_secs: i64,
    /// Grace window before a same-year date counts as already passed.
    pub near_past_slack_secs: i64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            window_upper_secs: DEFAULT_WINDOW_UPPER_SECS,
            window_lower_secs: DEFAULT_WINDOW_LOWER_SECS,
            near_past_slack_secs: DEFAULT_NEAR_PAST_SLACK_SECS,
        }
    }
}

impl TimingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            poll_interval_secs: profiled_env_parse(p, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            window_upper_secs: profiled_env_parse(p, "WINDOW_UPPER_SECS", DEFAULT_WINDOW_UPPER_SECS),
            window_lower_secs: profiled_env_parse(p, "WINDOW_LOWER_SECS", DEFAULT_WINDOW_LOWER_SECS),
            near_past_slack_secs: profiled_env_parse(p, "NEAR_PAST_SLACK_SECS", DEFAULT_NEAR_PAST_SLACK_SECS),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Clamped to `0..=MAX_NEAR_PAST_SLACK_SECS`; [`validate`](Self::validate)
    /// rejects values outside that range.
    pub fn near_past_slack(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.near_past_slack_secs.clamp(0, MAX_NEAR_PAST_SLACK_SECS))
    }

    /// The window must be ordered and wider than one poll interval, otherwise
    /// an occurrence could slip between two ticks.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(HeraldError::Config("POLL_INTERVAL_SECS must be > 0".to_string()));
        }
        for (key, value) in [
            ("WINDOW_LOWER_SECS", self.window_lower_secs),
            ("WINDOW_UPPER_SECS", self.window_upper_secs),
        ] {
            if !(0..=MAX_WINDOW_SECS).contains(&value) {
                return Err(HeraldError::Config(format!(
                    "{key} must be within 0..={MAX_WINDOW_SECS}, got {value}"
                )));
            }
        }
        if self.window_lower_secs > self.window_upper_secs {
            return Err(HeraldError::Config(format!(
                "WINDOW_LOWER_SECS ({}) exceeds WINDOW_UPPER_SECS ({})",
                self.window_lower_secs, self.window_upper_secs
            )));
        }
        let width = (self.window_upper_secs - self.window_lower_secs) as u64;
        if self.poll_interval_secs >= width {
            return Err(HeraldError::Config(format!(
                "POLL_INTERVAL_SECS ({}) must be smaller than the firing window ({}s)",
                self.poll_interval_secs, width
            )));
        }
        if !(0..=MAX_NEAR_PAST_SLACK_SECS).contains(&self.near_past_slack_secs) {
            return Err(HeraldError::Config(format!(
                "NEAR_PAST_SLACK_SECS must be within 0..={MAX_NEAR_PAST_SLACK_SECS}, got {}",
                self.near_past_slack_secs
            )));
        }
        Ok(())
    }
}

// ── Liveness endpoint ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub host: String,
    pub port: u16,
}

impl HealthConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HEALTH_HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "HEALTH_PORT", 8080),
        }
    }
}
