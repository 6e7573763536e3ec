//! Minijinja rendering of reminder text.
//!
//! The template is compiled once when the renderer is built, so a broken
//! `REMINDER_TEMPLATE` is rejected at startup rather than on the first
//! firing.

use chrono::{DateTime, Utc};
use minijinja::Environment;

use crate::traits::NotifyError;

/// Built-in reminder text.
pub const DEFAULT_TEMPLATE: &str =
    "{{ mention }} {{ type | capitalize }} starts in {{ minutes_until }} minutes ({{ starts_at }} UTC)";

const TEMPLATE_NAME: &str = "reminder";

/// Variables available to reminder templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderContext {
    /// Event type, e.g. `ruins`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Start time formatted `%d.%m. %H:%M`.
    pub starts_at: String,
    /// Whole minutes until the start, rounded to nearest.
    pub minutes_until: i64,
    /// Mention prefix, empty when none is configured.
    pub mention: String,
    /// Occurrence key.
    pub key: String,
}

impl ReminderContext {
    pub fn new(
        event_type: &str,
        key: &str,
        starts_at: DateTime<Utc>,
        now: DateTime<Utc>,
        mention: Option<&str>,
    ) -> Self {
        let secs = (starts_at - now).num_seconds();
        Self {
            event_type: event_type.to_string(),
            starts_at: starts_at.format("%d.%m. %H:%M").to_string(),
            minutes_until: (secs as f64 / 60.0).round() as i64,
            mention: mention.unwrap_or_default().to_string(),
            key: key.to_string(),
        }
    }
}

/// Renders reminder text from a single pre-compiled template.
#[derive(Debug)]
pub struct ReminderRenderer {
    env: Environment<'static>,
}

impl ReminderRenderer {
    /// Compile `template`, or [`DEFAULT_TEMPLATE`] when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template has syntax errors.
    pub fn new(template: Option<&str>) -> Result<Self, NotifyError> {
        let source = template.unwrap_or(DEFAULT_TEMPLATE).to_string();
        let mut env = Environment::new();
        env.add_filter("capitalize", capitalize_filter);
        env.add_template_owned(TEMPLATE_NAME, source)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { env })
    }

    /// Render the reminder with surrounding whitespace trimmed.
    pub fn render(&self, ctx: &ReminderContext) -> Result<String, NotifyError> {
        let tmpl = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        let text = tmpl.render(ctx).map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}

/// Upper-case the first character only; the rest is left as written.
fn capitalize_filter(value: String) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(mention: Option<&str>) -> ReminderContext {
        let starts = Utc.with_ymd_and_hms(2025, 2, 3, 18, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 2, 3, 17, 0, 5).unwrap();
        ReminderContext::new("ruins", "ruins:2025-02-03T18:00:00Z", starts, now, mention)
    }

    #[test]
    fn context_fields() {
        let c = ctx(None);
        assert_eq!(c.starts_at, "03.02. 18:00");
        assert_eq!(c.minutes_until, 60);
        assert_eq!(c.mention, "");
    }

    #[test]
    fn default_template_without_mention_is_trimmed() {
        let renderer = ReminderRenderer::new(None).unwrap();
        assert_eq!(
            renderer.render(&ctx(None)).unwrap(),
            "Ruins starts in 60 minutes (03.02. 18:00 UTC)"
        );
    }

    #[test]
    fn default_template_with_mention() {
        let renderer = ReminderRenderer::new(None).unwrap();
        assert_eq!(
            renderer.render(&ctx(Some("<@&1234>"))).unwrap(),
            "<@&1234> Ruins starts in 60 minutes (03.02. 18:00 UTC)"
        );
    }

    #[test]
    fn custom_template_sees_key() {
        let renderer = ReminderRenderer::new(Some("[{{ key }}] {{ type | upper }}")).unwrap();
        assert_eq!(renderer.render(&ctx(None)).unwrap(), "[ruins:2025-02-03T18:00:00Z] RUINS");
    }

    #[test]
    fn invalid_template_rejected_at_construction() {
        match ReminderRenderer::new(Some("{{ unclosed")) {
            Err(NotifyError::Template(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected Template error, got: {other:?}"),
        }
    }

    #[test]
    fn capitalize_only_touches_first_char() {
        assert_eq!(capitalize_filter("altar of war".to_string()), "Altar of war");
        assert_eq!(capitalize_filter(String::new()), "");
    }
}
