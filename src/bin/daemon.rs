//! # Wordminder Daemon
//!
//! Runs the reminder scheduler and the IPC server the CLI talks to.
//!
//! Usage: `cargo run --bin wordminder-daemon`

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use wordminder::core::Config;
use wordminder::features::notifications::{CommandNotifier, FanoutNotifier, LogNotifier, Notifier};
use wordminder::features::reminders::{LocalClock, ReminderScheduler};
use wordminder::ipc::{get_socket_path, IpcServer};
use wordminder::store::Store;

/// Interval between IPC heartbeats
const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting wordminder daemon...");

    let store = Arc::new(Store::open(&config.database_path).await?);

    let socket_path = get_socket_path();
    let ipc_server = Arc::new(IpcServer::new(socket_path.clone(), store.clone()));

    let mut targets: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier), ipc_server.clone()];
    if let Some(program) = &config.notify_command {
        info!("Desktop notifications via {program}");
        targets.push(Arc::new(CommandNotifier::new(program.clone())));
    }
    let notifier = Arc::new(FanoutNotifier::new(targets));

    let scheduler = ReminderScheduler::new(store.clone(), notifier, Arc::new(LocalClock));
    let watcher = scheduler.watch_settings(store.subscribe());
    scheduler.reload().await;

    let accept_loop = match ipc_server.clone().start(scheduler.clone()).await {
        Ok(handle) => {
            info!("📡 IPC server started for CLI communication");
            Some(handle)
        }
        Err(e) => {
            error!("Failed to start IPC server: {e}. CLI control will be unavailable.");
            None
        }
    };

    // Spawn IPC heartbeat task
    let heartbeat_ipc = ipc_server.clone();
    let heartbeat = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            interval.tick().await;
            heartbeat_ipc.send_heartbeat();
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    heartbeat.abort();
    watcher.abort();
    scheduler.shutdown();
    if let Some(handle) = accept_loop {
        handle.abort();
        if let Err(e) = std::fs::remove_file(&socket_path) {
            error!("Failed to remove IPC socket {socket_path}: {e}");
        }
    }

    Ok(())
}
