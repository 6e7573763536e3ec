//! Generic HTTP webhook notifier.
//!
//! POSTs the serialized [`Notification`] (`{"text": .., "metadata": {..}}`)
//! to a configured endpoint, for destinations that are not Discord.

use std::time::Duration;

use crate::traits::{http_client, Notification, Notifier, NotifyError, DEFAULT_SEND_TIMEOUT};

/// Delivers reminders as JSON over HTTP.
///
/// `${VAR_NAME}` references in the URL and header values are expanded
/// from the environment at construction time.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier for `url` with extra request headers.
    ///
    /// Missing env vars or an unterminated `${` produce [`NotifyError::Config`].
    pub fn new(url: &str, headers: &[(&str, &str)]) -> Result<Self, NotifyError> {
        let url = expand_env_refs(url)?;
        if url.trim().is_empty() {
            return Err(NotifyError::Config("webhook URL must not be empty".to_string()));
        }

        let headers = headers
            .iter()
            .map(|(name, value)| Ok((name.to_string(), expand_env_refs(value)?)))
            .collect::<Result<Vec<_>, NotifyError>>()?;

        Ok(Self {
            url,
            headers,
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
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(notification);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(5);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%status, body = %body, "webhook returned non-2xx status");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(%status, "webhook notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Expand every `${NAME}` in `input` from the process environment.
fn expand_env_refs(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| NotifyError::Config(format!("unclosed env var reference in: {input}")))?;
        let name = &after[..end];
        let value =
            std::env::var(name).map_err(|_| NotifyError::Config(format!("env var not found: {name}")))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
