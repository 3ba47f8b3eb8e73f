//! # Wordminder CLI
//!
//! Look up words, manage the saved list and reminder settings.
//!
//! Usage: `cargo run --bin wordminder -- lookup <word> [--save]`

use anyhow::Result;
use dotenvy::dotenv;
use log::error;

use wordminder::cli::{App, Command};
use wordminder::core::Config;
use wordminder::ipc::get_socket_path;
use wordminder::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().filter_or("LOG_LEVEL", "warn")).init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let app = App {
        store: Store::open(&config.database_path).await?,
        resolver_client: reqwest::Client::new(),
        endpoints: config.endpoints.clone(),
        socket_path: get_socket_path(),
    };

    if command == Command::Watch {
        return app.watch().await;
    }

    match app.run(command).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
