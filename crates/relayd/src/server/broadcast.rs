//! Broadcast loop - the single consumer of the fan-out channel.
//!
//! Waits for the next message, renders it once, and writes it to every
//! registered connection while holding the registry lock. A failed or
//! timed-out write is swallowed; that connection's own session notices the
//! broken transport on its next read and tears itself down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use relay_protocol::RelayMessage;

use crate::fanout::FanoutReceiver;
use crate::registry::{write_line, DeliveryReport};

use super::state::BroadcastServer;

/// Runs until cancelled or until every fan-out sender is dropped.
pub async fn run_broadcast_loop(
    server: Arc<BroadcastServer>,
    mut receiver: FanoutReceiver,
    cancel_token: CancellationToken,
) {
    debug!("Broadcast loop starting");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!("Broadcast loop shutting down");
                break;
            }

            message = receiver.recv() => {
                match message {
                    Some(message) => {
                        deliver(&server, &message).await;
                    }
                    None => {
                        debug!("Fan-out channel closed");
                        break;
                    }
                }
            }
        }
    }
}

/// Delivers one message to every registered connection.
pub async fn deliver(server: &BroadcastServer, message: &RelayMessage) -> DeliveryReport {
    let rendered = message.to_line();
    let line = rendered.as_str();
    let write_timeout = server.write_timeout();

    let report = server
        .registry()
        .for_each_connection(move |_, writer| async move {
            write_line(&writer, line, write_timeout).await
        })
        .await;

    trace!(
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast delivered"
    );
    report
}
