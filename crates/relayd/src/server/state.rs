//! Shared broadcast state.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use relay_core::RosterEntry;
use relay_protocol::RelayMessage;

use crate::config::ServerConfig;
use crate::fanout::{fanout_channel, FanoutReceiver, FanoutSender};
use crate::registry::Registry;

/// State shared by every session and the broadcast loop.
///
/// Constructed once per server and handed out as `Arc<BroadcastServer>`.
/// Owns the registry and the producer side of the fan-out channel.
pub struct BroadcastServer {
    registry: Registry,
    fanout: FanoutSender,
    max_line_bytes: usize,
    write_timeout: Duration,
}

impl BroadcastServer {
    /// Creates the shared state and the receiver the broadcast loop drains.
    pub fn new(config: &ServerConfig) -> (Arc<Self>, FanoutReceiver) {
        let (fanout, receiver) = fanout_channel();
        let server = Self {
            registry: Registry::new(),
            fanout,
            max_line_bytes: config.max_line_bytes,
            write_timeout: config.write_timeout(),
        };
        (Arc::new(server), receiver)
    }

    /// Returns the connection registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Enqueues a message for every registered connection.
    ///
    /// Never waits for delivery. If the broadcast loop is gone the message is
    /// dropped and logged.
    pub fn publish(&self, message: RelayMessage) {
        if let Err(e) = self.fanout.send(message) {
            debug!(error = %e, "Dropping message, broadcast loop stopped");
        }
    }

    /// Publishes the current roster, unless it is empty.
    pub async fn publish_roster(&self) {
        if let Some(message) = RelayMessage::roster(self.registry.snapshot().await) {
            self.publish(message);
        }
    }

    /// Returns a snapshot of connected peers.
    pub async fn roster(&self) -> Vec<RosterEntry> {
        self.registry.snapshot().await
    }

    /// Returns the number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }

    /// Longest input line a session accepts.
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Bound on each fan-out write.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}
