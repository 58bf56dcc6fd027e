//! Relay daemon - connection registry and broadcast server
//!
//! Accepts line-oriented TCP clients, relays every chat line to all of them
//! and keeps each client's roster of peers up to date.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8080 on all interfaces)
//! relayd
//!
//! # Listen somewhere else
//! relayd --listen 127.0.0.1:9000
//! RELAY_LISTEN=127.0.0.1:9000 relayd
//!
//! # Load limits from a TOML file
//! relayd --config /etc/relay/relayd.toml
//!
//! # Enable debug logging
//! RUST_LOG=relayd=debug relayd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relayd::config::ServerConfig;
use relayd::server::RelayServer;

/// Relay daemon - line chat broadcast server
#[derive(Parser, Debug)]
#[command(name = "relayd", version, about)]
struct Args {
    /// Address to listen on (overrides the config file)
    #[arg(short, long, env = "RELAY_LISTEN")]
    listen: Option<SocketAddr>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("relayd=info".parse()?),
        )
        .init();

    let config = ServerConfig::resolve(args.config.as_deref(), args.listen)
        .context("Failed to load configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        listen = %config.listen,
        "Relay daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let server = RelayServer::bind(&config, cancel_token)
        .await
        .context("Failed to start relay server")?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Relay daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
