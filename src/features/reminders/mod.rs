//! # Reminders Feature
//!
//! Periodic reminders of a random saved word inside an hour-of-day window.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod scheduler;
pub mod settings;
pub mod window;

pub use scheduler::{build_notification, ReminderScheduler, TickOutcome, FALLBACK_BODY};
pub use settings::ReminderSettings;
pub use window::{in_window, Clock, FixedClock, LocalClock};
