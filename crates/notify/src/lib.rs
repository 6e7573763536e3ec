//! Delivery collaborators for reminders.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Discord webhook and generic JSON webhook notifiers
//! - Minijinja rendering of reminder text
//! - `RoleGate` trait for authorizing operator commands

pub mod discord;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use discord::DiscordNotifier;
pub use templating::{ReminderContext, ReminderRenderer, DEFAULT_TEMPLATE};
pub use traits::{AllowListGate, Notification, Notifier, NotifyError, RoleGate, DEFAULT_SEND_TIMEOUT};
pub use webhook::WebhookNotifier;
