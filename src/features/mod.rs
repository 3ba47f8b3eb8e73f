//! # Features Layer
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod dictionary;
pub mod notifications;
pub mod reminders;

pub use dictionary::{DefinitionResolver, GroupedDefinitions};
pub use notifications::{CommandNotifier, FanoutNotifier, LogNotifier, Notification, Notifier};
pub use reminders::{ReminderScheduler, ReminderSettings};
