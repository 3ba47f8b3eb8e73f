//! # IPC Protocol
//!
//! Message types for daemon <-> CLI communication over Unix socket.
//!
//! Uses length-prefixed JSON framing:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON payload

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest accepted frame
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Daemon -> CLI Events
// ============================================================================

/// Events sent from the daemon to connected clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonEvent {
    /// A reminder notification was shown
    Reminder {
        title: String,
        body: String,
        timestamp: DateTime<Utc>,
    },
    /// Response to a command
    CommandResponse {
        request_id: String,
        success: bool,
        message: Option<String>,
    },
    /// Response to GetStatus
    Status {
        request_id: String,
        uptime_seconds: u64,
        reminders_armed: bool,
        interval_minutes: Option<u64>,
        saved_words: usize,
        clients: usize,
    },
    /// Heartbeat to keep connection alive
    Heartbeat { timestamp: i64 },
}

impl DaemonEvent {
    /// Request id this event answers, if it is a response
    pub fn request_id(&self) -> Option<&str> {
        match self {
            DaemonEvent::CommandResponse { request_id, .. }
            | DaemonEvent::Status { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

// ============================================================================
// CLI -> Daemon Commands
// ============================================================================

/// Commands sent from a client to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Show a reminder now, bypassing the timer
    TriggerReminder { request_id: String },
    /// Keys were written to the store by another process
    SettingsChanged {
        request_id: String,
        keys: Vec<String>,
    },
    /// Request daemon status
    GetStatus { request_id: String },
    /// Heartbeat response
    Pong { timestamp: i64 },
}

// ============================================================================
// Framing - Length-prefixed JSON messages
// ============================================================================

/// Encode a message with length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", json.len()));
    }
    let len = json.len() as u32;
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Read one frame body from an async reader.
///
/// Returns `Ok(None)` on a clean end of stream before a length prefix.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}
