// Core layer - shared types and configuration
pub mod core;

// Features layer - dictionary, notifications, reminders
pub mod features;

// IPC layer - communication between daemon and CLI
pub mod ipc;

// Persisted settings and saved words
pub mod store;

// Command line surface
pub mod cli;

pub use core::Config;

pub use features::{
    // Dictionary
    DefinitionResolver, GroupedDefinitions,
    // Notifications
    CommandNotifier, FanoutNotifier, LogNotifier, Notification, Notifier,
    // Reminders
    ReminderScheduler, ReminderSettings,
};

pub use ipc::{ClientCommand, DaemonEvent, IpcClient, IpcServer};
pub use store::{Meanings, SavedWord, Store};
