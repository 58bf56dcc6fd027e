//! TCP server for the relay daemon.
//!
//! The server:
//! - Listens on a TCP socket for client connections
//! - Spawns a SessionHandler for each client
//! - Runs the single broadcast loop that drains the fan-out channel
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐  publish   ┌─────────────────┐  recv   ┌─────────────────┐
//! │ SessionHandler  │───────────▶│ Fan-out channel │────────▶│ Broadcast loop  │
//! │  (per client)   │            └─────────────────┘         └────────┬────────┘
//! └───────┬─────────┘                                                 │
//!         │ register / deregister / snapshot        for_each_connection
//!         ▼                                                           ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                      Registry (one tokio Mutex)                           │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and allow continued operation

mod broadcast;
mod session;
mod state;

pub use broadcast::{deliver, run_broadcast_loop};
pub use session::{SessionError, SessionHandler};
pub use state::BroadcastServer;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use relay_core::ConnectionId;

use crate::config::ServerConfig;
use crate::fanout::FanoutReceiver;
use crate::registry::peer_writer;

/// TCP server for the relay.
///
/// Owns the listener, the shared [`BroadcastServer`] state and the receiver
/// the broadcast loop drains.
pub struct RelayServer {
    /// Bound listener
    listener: TcpListener,

    /// Registry and fan-out producer shared with every session
    state: Arc<BroadcastServer>,

    /// Consumer side of the fan-out channel, moved into the broadcast loop
    receiver: FanoutReceiver,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating connection ids
    connection_counter: AtomicU64,
}

impl RelayServer {
    /// Binds the listener described by `config`.
    pub async fn bind(
        config: &ServerConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.listen,
                error: e.to_string(),
            })?;

        let (state, receiver) = BroadcastServer::new(config);

        Ok(Self {
            listener,
            state,
            receiver,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Returns the shared broadcast state.
    pub fn state(&self) -> Arc<BroadcastServer> {
        Arc::clone(&self.state)
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered.
    pub async fn run(self) -> Result<(), ServerError> {
        let RelayServer {
            listener,
            state,
            receiver,
            cancel_token,
            connection_counter,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "Relay server listening");
        }

        tokio::spawn(run_broadcast_loop(
            Arc::clone(&state),
            receiver,
            cancel_token.clone(),
        ));

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let connection =
                                ConnectionId::new(connection_counter.fetch_add(1, Ordering::Relaxed));
                            spawn_session(stream, peer, connection, &state);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        let connections = state.connection_count().await;
        info!(connections, "Server stopped");
        Ok(())
    }
}

/// Hands an accepted stream to a new session task.
fn spawn_session(
    stream: TcpStream,
    peer: SocketAddr,
    connection: ConnectionId,
    state: &Arc<BroadcastServer>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(connection = %connection, error = %e, "Failed to set TCP_NODELAY");
    }

    let (reader, writer) = stream.into_split();
    let handler = SessionHandler::new(
        BufReader::new(reader),
        peer_writer(writer),
        connection,
        Arc::clone(state),
    )
    .with_peer(peer);

    tokio::spawn(handler.run());
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Failed to read local address: {0}")]
    LocalAddr(String),
}
