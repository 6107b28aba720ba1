//! Server core
//!
//! Binds the command socket, prepares the storage tree, and runs the
//! accept loop. One task per connection; command bodies run on the
//! blocking pool since every operation is filesystem I/O plus a bounded
//! lock wait.

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::diagnostics;
use crate::error::ServerError;
use crate::protocol::{Response, handle_command, parse_command};
use crate::store::StoreContext;

pub struct Server {
    listener: TcpListener,
    ctx: Arc<StoreContext>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let socket = config.control_socket();
        let listener = TcpListener::bind(&socket).await?;
        info!("Server bound to {}", socket);

        let storage_root = config.storage_root_path();
        std::fs::create_dir_all(&storage_root)?;

        let diagnostics = diagnostics::spawn(storage_root.join("memvault-debug.log"));
        info!("Diagnostics instance token: {}", diagnostics.instance());

        let ctx = StoreContext::new(
            &storage_root,
            &config.namespace,
            config.lock_settings(),
            diagnostics,
        )?;
        info!(
            "Serving {} from {}",
            ctx.prefix(),
            ctx.namespace_root().display()
        );

        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
        })
    }

    pub async fn start(&self) {
        info!("Starting memvault server");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&self.ctx);

                    // Spawn a task per connection so the accept loop never blocks
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, ctx).await {
                            warn!("Connection {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Reads newline-delimited JSON commands and writes one response line per
/// command. Malformed input produces an error response and keeps the
/// connection open.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: Arc<StoreContext>,
) -> Result<(), std::io::Error> {
    info!("Client connected: {}", addr);

    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            info!("Connection closed by client {}", addr);
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_command(&line) {
            Ok(command) => {
                let ctx = Arc::clone(&ctx);
                match tokio::task::spawn_blocking(move || handle_command(&ctx, command)).await {
                    Ok(result) => Response::from_result(result),
                    Err(e) => {
                        error!("Command task failed for {}: {}", addr, e);
                        Response::error("Internal server error".to_string())
                    }
                }
            }
            Err(e) => Response::error(format!("Malformed command: {}", e)),
        };

        reader
            .get_mut()
            .write_all(response.to_json_line().as_bytes())
            .await?;
        reader.get_mut().flush().await?;
    }
}
