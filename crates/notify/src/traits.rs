//! Notifier and role-gate trait definitions and shared error types.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default bound on one delivery attempt, connect through response.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client whose requests fail with [`NotifyError::Http`] once `timeout`
/// elapses.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, NotifyError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Destination rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered reminder ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// The rendered message text.
    pub text: String,
    /// Additional metadata (occurrence key, event type).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Trait for delivery channel implementations.
///
/// Implementations must fail fast rather than hang: the poll loop awaits
/// every send and applies no timeout or retry of its own. The HTTP
/// notifiers bound each request by [`DEFAULT_SEND_TIMEOUT`] unless
/// configured otherwise.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to this channel's single destination.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Test connectivity with a sample message.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = Notification::new("[TEST] herald reminder delivery test")
            .with_metadata("event", "test");
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "discord", "webhook").
    fn channel_name(&self) -> &str;
}

/// Cooperative authorization check for interactive commands.
///
/// Not consulted by the reminder loop.
pub trait RoleGate: Send + Sync {
    fn is_authorized(&self, actor: &str) -> bool;
}

/// [`RoleGate`] backed by a fixed set of actor identifiers.
///
/// An empty allow list authorizes nobody.
#[derive(Debug, Clone, Default)]
pub struct AllowListGate {
    allowed: HashSet<String>,
}

impl AllowListGate {
    pub fn new<I, S>(actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: actors.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blank entries.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }
}

impl RoleGate for AllowListGate {
    fn is_authorized(&self, actor: &str) -> bool {
        self.allowed.contains(actor)
    }
}
