//! Discord webhook notifier.
//!
//! Delivers reminders by POSTing `{"content": text}` to a channel webhook
//! URL. Discord answers `204 No Content` on success and `429` with a JSON
//! `retry_after` (seconds, fractional) when rate limited.

use std::time::Duration;

use crate::traits::{http_client, Notification, Notifier, NotifyError, DEFAULT_SEND_TIMEOUT};

/// Maximum message length accepted by Discord.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Truncate `text` to Discord's content limit on a char boundary, marking
/// the cut with an ellipsis.
pub fn clamp_content(text: &str) -> String {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(MAX_CONTENT_CHARS - 1).collect();
    clamped.push('…');
    clamped
}

/// Sends reminders to a Discord channel through an incoming webhook.
#[derive(Debug)]
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    /// Creates a new `DiscordNotifier` from a configured webhook URL.
    ///
    /// If `webhook_url` starts with `${`, the value between `${` and `}` is
    /// resolved as an environment variable name. Returns
    /// [`NotifyError::Config`] if the URL is empty, the env var is missing,
    /// or the URL is not http(s).
    pub fn from_config(webhook_url: String) -> Result<Self, NotifyError> {
        let resolved = if webhook_url.starts_with("${") {
            let var_name = webhook_url
                .strip_prefix("${")
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| NotifyError::Config(format!("Malformed env var reference: {webhook_url}")))?;
            std::env::var(var_name)
                .map_err(|_| NotifyError::Config(format!("Environment variable '{var_name}' is not set")))?
        } else {
            webhook_url
        };

        let resolved = resolved.trim().to_string();
        if resolved.is_empty() {
            return Err(NotifyError::Config("Discord webhook URL must not be empty".to_string()));
        }
        if !(resolved.starts_with("https://") || resolved.starts_with("http://")) {
            return Err(NotifyError::Config("Discord webhook URL must be an http(s) URL".to_string()));
        }

        Ok(Self {
            webhook_url: resolved,
            client: http_client(DEFAULT_SEND_TIMEOUT)?,
        })
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, NotifyError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = serde_json::json!({ "content": clamp_content(&notification.text) });

        tracing::debug!(chars = notification.text.chars().count(), "Sending Discord notification");

        let response = self.client.post(&self.webhook_url).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!(%status, "Discord notification accepted");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("retry_after").and_then(|r| r.as_f64()))
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(5);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body: text,
        })
    }

    fn channel_name(&self) -> &str {
        "discord"
    }
}
