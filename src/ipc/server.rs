//! # IPC Server
//!
//! Unix socket server for the daemon to communicate with CLI clients.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: SettingsChanged relays keys into the store change channel
//! - 1.1.0: Acts as a reminder notifier for `watch` clients
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

use crate::features::notifications::{Notification, Notifier};
use crate::features::reminders::ReminderScheduler;
use crate::ipc::protocol::{encode_message, read_frame, ClientCommand, DaemonEvent};
use crate::store::Store;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

/// Maximum number of connected clients
const MAX_CLIENTS: usize = 10;

/// Broadcast channel capacity for events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// IPC server handle for the daemon
pub struct IpcServer {
    socket_path: String,
    /// Broadcast sender for events to all clients
    event_tx: broadcast::Sender<DaemonEvent>,
    /// Connected client count
    client_count: Arc<RwLock<usize>>,
    store: Arc<Store>,
    /// Server start time for uptime calculation
    start_time: Instant,
}

impl IpcServer {
    /// Create a new IPC server (does not start listening yet)
    pub fn new(socket_path: impl Into<String>, store: Arc<Store>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        IpcServer {
            socket_path: socket_path.into(),
            event_tx,
            client_count: Arc::new(RwLock::new(0)),
            store,
            start_time: Instant::now(),
        }
    }

    /// Bind the socket and spawn the accept loop
    pub async fn start(self: Arc<Self>, scheduler: Arc<ReminderScheduler>) -> Result<JoinHandle<()>> {
        // Remove a stale socket left by a previous run
        if std::path::Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {}", self.socket_path);

        let server = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        if !server.try_reserve_client().await {
                            warn!("Maximum IPC clients reached ({}), rejecting connection", MAX_CLIENTS);
                            continue;
                        }

                        let server_clone = server.clone();
                        let scheduler = scheduler.clone();
                        tokio::spawn(async move {
                            let client_count_ref = server_clone.client_count.clone();
                            if let Err(e) = server_clone.handle_client(stream, scheduler).await {
                                debug!("Client handler ended: {}", e);
                            }
                            *client_count_ref.write().await -= 1;
                            info!("CLI client disconnected");
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept IPC connection: {}", e);
                    }
                }
            }
        });

        Ok(handle)
    }

    /// Reserve a client slot, or `false` when `MAX_CLIENTS` are connected
    async fn try_reserve_client(&self) -> bool {
        let mut count = self.client_count.write().await;
        if *count >= MAX_CLIENTS {
            return false;
        }
        *count += 1;
        info!("CLI client connected (total: {})", *count);
        true
    }

    /// Handle a connected client
    async fn handle_client(self: Arc<Self>, stream: UnixStream, scheduler: Arc<ReminderScheduler>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Subscribe before reading so responses to this client's commands are seen
        let mut event_rx = self.event_tx.subscribe();

        let write_handle = tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => match encode_message(&event) {
                        Ok(data) => {
                            if let Err(e) = writer.write_all(&data).await {
                                debug!("Failed to write to client: {}", e);
                                break;
                            }
                            if let Err(e) = writer.flush().await {
                                debug!("Failed to flush to client: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to encode event: {}", e);
                        }
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged behind by {} events", n);
                    }
                }
            }
        });

        loop {
            let buf = match read_frame(&mut reader).await {
                Ok(Some(buf)) => buf,
                Ok(None) => break,
                Err(e) => {
                    debug!("Failed to read from client: {}", e);
                    break;
                }
            };

            match serde_json::from_slice::<ClientCommand>(&buf) {
                Ok(cmd) => {
                    debug!("Processing client command: {:?}", cmd);
                    self.process_command(cmd, &scheduler).await;
                }
                Err(e) => {
                    warn!("Failed to parse command from client: {}", e);
                }
            }
        }

        write_handle.abort();
        Ok(())
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event: DaemonEvent) {
        // No receivers is not an error
        let _ = self.event_tx.send(event);
    }

    /// Get connected client count
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Send a heartbeat to all clients
    pub fn send_heartbeat(&self) {
        let timestamp = chrono::Utc::now().timestamp();
        self.broadcast(DaemonEvent::Heartbeat { timestamp });
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Process a single client command and broadcast the response
    pub async fn process_command(&self, cmd: ClientCommand, scheduler: &Arc<ReminderScheduler>) {
        match cmd {
            ClientCommand::TriggerReminder { request_id } => {
                // Answer right away; the tick runs in the background
                scheduler.trigger_now();
                self.broadcast(DaemonEvent::CommandResponse {
                    request_id,
                    success: true,
                    message: Some("Reminder triggered".to_string()),
                });
            }
            ClientCommand::SettingsChanged { request_id, keys } => {
                debug!("Relaying settings change for {:?}", keys);
                self.store.notify_changed(keys);
                self.broadcast(DaemonEvent::CommandResponse {
                    request_id,
                    success: true,
                    message: None,
                });
            }
            ClientCommand::GetStatus { request_id } => {
                let saved_words = match self.store.list_words().await {
                    Ok(words) => words.len(),
                    Err(e) => {
                        warn!("Failed to count saved words: {}", e);
                        0
                    }
                };
                let period = scheduler.active_period();
                self.broadcast(DaemonEvent::Status {
                    request_id,
                    uptime_seconds: self.get_uptime_seconds(),
                    reminders_armed: period.is_some(),
                    interval_minutes: period.map(|p| p.as_secs() / 60),
                    saved_words,
                    clients: self.client_count().await,
                });
                debug!("Sent Status response");
            }
            ClientCommand::Pong { timestamp } => {
                debug!("Received Pong with timestamp {}", timestamp);
            }
        }
    }
}

#[async_trait]
impl Notifier for IpcServer {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.broadcast(DaemonEvent::Reminder {
            title: notification.title.clone(),
            body: notification.body.clone(),
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }
}
