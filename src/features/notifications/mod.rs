//! # Notifications Feature
//!
//! Delivery of reminder notifications. The daemon fans each reminder out to
//! the log, connected IPC watchers and an optional desktop notify command.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Added CommandNotifier for desktop notification programs
//! - 1.0.0: Initial log notifier

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use tokio::process::Command;

use crate::core::{truncate_for_body, truncate_for_title};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Build a notification, truncating title and body to display limits
    pub fn new(title: impl AsRef<str>, body: impl AsRef<str>) -> Self {
        Notification {
            title: truncate_for_title(title.as_ref()),
            body: truncate_for_body(body.as_ref()),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes reminders to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!("🔔 {} | {}", notification.title, notification.body);
        Ok(())
    }
}

/// Runs an external program as `<program> <title> <body>`, e.g. `notify-send`
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let output = Command::new(&self.program)
            .arg(&notification.title)
            .arg(&notification.body)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to run {}: {}", self.program, e))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// Delivers to every inner notifier; fails if any of them failed
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let mut failures = Vec::new();
        for target in &self.targets {
            if let Err(e) = target.notify(notification).await {
                warn!("Notification target failed: {e}");
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of {} notification targets failed: {}",
                failures.len(),
                self.targets.len(),
                failures.join("; ")
            ))
        }
    }
}
