//! Memvault - Entry Point
//!
//! A persistent, path-namespaced file store served over a small fixed
//! command set, safe for concurrent access by independent processes
//! sharing one storage root.

use log::{error, info};

use memvault::Server;
use memvault::config::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching memory store server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match Server::new(config).await {
        Ok(server) => server.start().await,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    }
}
