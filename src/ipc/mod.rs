//! # IPC Module
//!
//! Inter-process communication between the daemon and CLI.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Request/response helpers on the client
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

pub mod protocol;
pub mod server;
pub mod client;

pub use protocol::{ClientCommand, DaemonEvent};
pub use server::IpcServer;
pub use client::{IpcClient, connect_with_retry};

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/wordminder.sock";

/// Get the socket path from environment or use default
pub fn get_socket_path() -> String {
    std::env::var("WORDMINDER_IPC_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string())
}
