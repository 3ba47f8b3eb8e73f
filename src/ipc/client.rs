//! # IPC Client
//!
//! Unix socket client for the CLI to communicate with the daemon.

use crate::ipc::protocol::{encode_message, read_frame, ClientCommand, DaemonEvent};
use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the daemon to answer a request
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// IPC client for the CLI
pub struct IpcClient {
    /// Event receiver channel
    event_rx: mpsc::Receiver<DaemonEvent>,
    /// Command sender channel
    command_tx: mpsc::Sender<ClientCommand>,
    /// Events that arrived while waiting for a response
    pending: VecDeque<DaemonEvent>,
}

impl IpcClient {
    /// Connect to the daemon's IPC server
    pub async fn connect(socket_path: &str) -> Result<Self> {
        debug!("Connecting to IPC server at {}", socket_path);

        let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(socket_path))
            .await
            .map_err(|_| anyhow!("Connection timeout"))?
            .map_err(|e| anyhow!("Failed to connect: {}", e))?;

        info!("Connected to IPC server");

        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            Self::connection_loop(stream, event_tx, command_rx).await;
        });

        Ok(IpcClient {
            event_rx,
            command_tx,
            pending: VecDeque::new(),
        })
    }

    /// Main connection loop - handles reading events and writing commands
    async fn connection_loop(
        stream: UnixStream,
        event_tx: mpsc::Sender<DaemonEvent>,
        mut command_rx: mpsc::Receiver<ClientCommand>,
    ) {
        let (mut reader, mut writer) = stream.into_split();

        let write_handle = tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                match encode_message(&cmd) {
                    Ok(data) => {
                        if let Err(e) = writer.write_all(&data).await {
                            error!("Failed to write command: {}", e);
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            error!("Failed to flush command: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to encode command: {}", e);
                    }
                }
            }
        });

        loop {
            let buf = match read_frame(&mut reader).await {
                Ok(Some(buf)) => buf,
                Ok(None) => break,
                Err(e) => {
                    error!("Read error: {}", e);
                    break;
                }
            };

            match serde_json::from_slice::<DaemonEvent>(&buf) {
                Ok(event) => {
                    if let DaemonEvent::Heartbeat { timestamp } = &event {
                        debug!("Received heartbeat: {}", timestamp);
                    }

                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse event: {}", e);
                }
            }
        }

        write_handle.abort();
        debug!("IPC connection closed");
    }

    /// Receive an event (blocking)
    pub async fn recv(&mut self) -> Option<DaemonEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.event_rx.recv().await
    }

    /// Send a command to the daemon
    pub async fn send(&self, cmd: ClientCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| anyhow!("Failed to send command: {}", e))
    }

    /// Wait for the response carrying `request_id`, keeping other events for `recv`
    async fn await_response(&mut self, request_id: &str) -> Result<DaemonEvent> {
        let event_rx = &mut self.event_rx;
        let pending = &mut self.pending;

        let wait = async {
            while let Some(event) = event_rx.recv().await {
                if event.request_id() == Some(request_id) {
                    return Ok(event);
                }
                pending.push_back(event);
            }
            Err(anyhow!("Connection closed before response"))
        };

        timeout(RESPONSE_TIMEOUT, wait)
            .await
            .map_err(|_| anyhow!("Timed out waiting for daemon response"))?
    }

    async fn expect_success(&mut self, request_id: &str) -> Result<Option<String>> {
        match self.await_response(request_id).await? {
            DaemonEvent::CommandResponse {
                success: true, message, ..
            } => Ok(message),
            DaemonEvent::CommandResponse { message, .. } => Err(anyhow!(
                "Daemon rejected command: {}",
                message.unwrap_or_else(|| "no reason given".to_string())
            )),
            other => Err(anyhow!("Unexpected response: {:?}", other)),
        }
    }

    /// Ask the daemon to show a reminder now
    pub async fn trigger_reminder(&mut self) -> Result<Option<String>> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(ClientCommand::TriggerReminder {
            request_id: request_id.clone(),
        })
        .await?;
        self.expect_success(&request_id).await
    }

    /// Tell the daemon that keys were written to the shared store
    pub async fn settings_changed(&mut self, keys: Vec<String>) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(ClientCommand::SettingsChanged {
            request_id: request_id.clone(),
            keys,
        })
        .await?;
        self.expect_success(&request_id).await.map(|_| ())
    }

    /// Request daemon status
    pub async fn status(&mut self) -> Result<DaemonEvent> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(ClientCommand::GetStatus {
            request_id: request_id.clone(),
        })
        .await?;
        self.await_response(&request_id).await
    }
}

/// Try to connect with retries
pub async fn connect_with_retry(socket_path: &str, max_attempts: u32, delay: Duration) -> Result<IpcClient> {
    let mut attempt = 1;
    loop {
        match IpcClient::connect(socket_path).await {
            Ok(client) => return Ok(client),
            Err(e) if attempt < max_attempts => {
                warn!(
                    "Connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to connect after {} attempts: {}",
                    max_attempts,
                    e
                ));
            }
        }
    }
}
