//! Registry storage - both maps behind a single lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use relay_core::{ClientRecord, ConnectionId, RosterEntry};

use super::writer::{DeliveryError, PeerWriter};

/// A registered connection: who it claims to be and how to reach it.
pub struct ConnectionEntry {
    /// Display name announced in the handshake
    pub name: String,

    /// Writer shared with the broadcast loop
    pub writer: PeerWriter,
}

/// Outcome of one fan-out pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct RegistryState {
    /// Primary store: connection → display name (plus writer)
    by_connection: HashMap<ConnectionId, ConnectionEntry>,

    /// Roster store: reported address → display name.
    /// Last writer wins when two clients report the same address.
    by_address: HashMap<String, String>,
}

/// Registry of live connections.
///
/// Every operation takes the single lock for its full duration. Apart from
/// [`Registry::for_each_connection`], critical sections only mutate or copy
/// map contents.
#[derive(Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under the identity from its handshake.
    ///
    /// Inserts `connection → name` and `address → name`. Registering the same
    /// connection twice is a caller bug; the second call replaces the first
    /// and logs a warning.
    pub async fn register(&self, connection: ConnectionId, record: &ClientRecord, writer: PeerWriter) {
        let mut state = self.state.lock().await;

        let previous = state.by_connection.insert(
            connection,
            ConnectionEntry {
                name: record.name.clone(),
                writer,
            },
        );
        if previous.is_some() {
            warn!(connection = %connection, "Connection registered twice");
        }

        if let Some(shadowed) = state
            .by_address
            .insert(record.address.clone(), record.name.clone())
        {
            debug!(
                address = %record.address,
                shadowed = %shadowed,
                name = %record.name,
                "Reported address already in roster, replacing"
            );
        }
    }

    /// Removes a connection and its roster address.
    ///
    /// Returns `true` if the connection was present. Removing an absent
    /// connection is a no-op.
    pub async fn deregister(&self, connection: ConnectionId, address: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.by_connection.remove(&connection).is_some();
        state.by_address.remove(address);
        removed
    }

    /// Returns a point-in-time copy of the roster.
    ///
    /// Order is unspecified.
    pub async fn snapshot(&self) -> Vec<RosterEntry> {
        let state = self.state.lock().await;
        state
            .by_address
            .iter()
            .map(|(address, name)| RosterEntry::new(address.clone(), name.clone()))
            .collect()
    }

    /// Applies `deliver` to every registered connection while holding the lock.
    ///
    /// No connection can be added or removed mid-pass. A failure on one
    /// connection is logged and counted, and delivery continues with the
    /// rest. Since the lock is held across each write, a slow connection
    /// delays the whole pass; callers bound each write with a timeout.
    pub async fn for_each_connection<F, Fut>(&self, mut deliver: F) -> DeliveryReport
    where
        F: FnMut(ConnectionId, PeerWriter) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        let state = self.state.lock().await;
        let mut report = DeliveryReport::default();

        for (connection, entry) in state.by_connection.iter() {
            match deliver(*connection, Arc::clone(&entry.writer)).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!(
                        connection = %connection,
                        name = %entry.name,
                        error = %e,
                        "Failed to deliver to connection"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Returns `(connection, name)` for every registered connection.
    pub async fn connections(&self) -> Vec<(ConnectionId, String)> {
        let state = self.state.lock().await;
        state
            .by_connection
            .iter()
            .map(|(connection, entry)| (*connection, entry.name.clone()))
            .collect()
    }

    /// Returns whether `connection` is currently registered.
    pub async fn contains(&self, connection: ConnectionId) -> bool {
        self.state.lock().await.by_connection.contains_key(&connection)
    }

    /// Returns the number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.by_connection.len()
    }
}
