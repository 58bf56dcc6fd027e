//! Session handler for individual client connections.
//!
//! Each accepted connection gets its own `SessionHandler` that:
//! - Reads and parses the handshake line
//! - Registers the connection and broadcasts a welcome
//! - Alternates roster broadcasts with blocking line reads, relaying chat
//! - Deregisters, announces the departure and closes the connection
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A malformed handshake closes the session without registering it
//! - Read failures end the session; they are never propagated further

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use relay_core::{ClientRecord, ConnectionId};
use relay_protocol::{parse_handshake, HandshakeError, RelayMessage};

use crate::registry::PeerWriter;

use super::state::BroadcastServer;

/// Drives one client connection from handshake to teardown.
pub struct SessionHandler<R> {
    /// Buffered reader for incoming lines
    reader: R,

    /// Writer shared with the broadcast loop once registered
    writer: PeerWriter,

    /// Registry key for this connection
    connection: ConnectionId,

    /// Transport-level peer address, for logging only
    peer: Option<String>,

    /// Shared registry and fan-out channel
    server: Arc<BroadcastServer>,
}

impl<R> SessionHandler<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Creates a new session handler.
    pub fn new(
        reader: R,
        writer: PeerWriter,
        connection: ConnectionId,
        server: Arc<BroadcastServer>,
    ) -> Self {
        Self {
            reader,
            writer,
            connection,
            peer: None,
            server,
        }
    }

    /// Records the transport peer address for log output.
    pub fn with_peer(mut self, peer: impl ToString) -> Self {
        self.peer = Some(peer.to_string());
        self
    }

    /// Runs the session to completion.
    ///
    /// Returns the client's record if the handshake succeeded, `None` if the
    /// session was rejected before registration. The connection is closed
    /// on every path.
    pub async fn run(mut self) -> Option<ClientRecord> {
        debug!(connection = %self.connection, peer = ?self.peer, "New client connected");

        let record = match self.handle_handshake().await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    connection = %self.connection,
                    peer = ?self.peer,
                    error = %e,
                    "Handshake failed"
                );
                self.close().await;
                return None;
            }
        };

        self.register(&record).await;

        if let Err(e) = self.process_lines(&record).await {
            debug!(
                connection = %self.connection,
                name = %record.name,
                error = %e,
                "Session read ended"
            );
        }

        self.teardown(&record).await;
        Some(record)
    }

    /// Reads the first line and parses it into a client record.
    async fn handle_handshake(&mut self) -> Result<ClientRecord, SessionError> {
        let line = self.read_line().await?;
        let parsed = parse_handshake(&line)?;
        Ok(parsed.into_record())
    }

    /// Registers the connection and broadcasts the welcome.
    async fn register(&self, record: &ClientRecord) {
        let registry = self.server.registry();
        registry
            .register(self.connection, record, Arc::clone(&self.writer))
            .await;

        info!(
            connection = %self.connection,
            name = %record.name,
            address = %record.address,
            "Client joined"
        );
        for (connection, name) in registry.connections().await {
            debug!(connection = %connection, name = %name, "Registered client");
        }

        self.server.publish(RelayMessage::welcome(record.name.clone()));
    }

    /// Active state: roster push, then one blocking read, repeated.
    ///
    /// Returns only with the error that ended the session.
    async fn process_lines(&mut self, record: &ClientRecord) -> Result<(), SessionError> {
        loop {
            self.server.publish_roster().await;

            let line = self.read_line().await?;
            self.server
                .publish(RelayMessage::chat(record.name.clone(), line.trim()));
        }
    }

    /// Deregisters, announces the departure and closes the connection.
    async fn teardown(&self, record: &ClientRecord) {
        let removed = self
            .server
            .registry()
            .deregister(self.connection, &record.address)
            .await;
        if !removed {
            debug!(connection = %self.connection, "Connection already deregistered");
        }

        self.server
            .publish(RelayMessage::departure(record.name.clone()));
        info!(connection = %self.connection, name = %record.name, "Client left");

        self.close().await;
    }

    /// Shuts down the write side; the read side drops with the handler.
    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!(connection = %self.connection, error = %e, "Failed to shut down writer");
        }
    }

    /// Reads one complete newline-terminated line.
    ///
    /// A trailing fragment without a newline at end of stream counts as end
    /// of stream, and a line longer than the configured limit is an error.
    /// Bytes that are not valid UTF-8 are replaced, not rejected.
    async fn read_line(&mut self) -> Result<String, SessionError> {
        let max = self.server.max_line_bytes();
        let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
        let mut buf = Vec::new();

        let bytes_read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;

        if bytes_read > max {
            return Err(SessionError::LineTooLong { max });
        }
        if bytes_read == 0 || !buf.ends_with(b"\n") {
            return Err(SessionError::Eof);
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid handshake: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Line exceeds {max} bytes")]
    LineTooLong { max: usize },
}
