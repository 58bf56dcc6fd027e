//! Fan-out channel: many producers, one consumer.
//!
//! Every session publishes into the same FIFO queue and the broadcast loop is
//! its only reader. The queue is unbounded, so publishing never waits for
//! delivery and a session's read loop is never held up by a roster push.

use tokio::sync::mpsc;

use relay_protocol::RelayMessage;

/// Creates a connected sender/receiver pair.
pub fn fanout_channel() -> (FanoutSender, FanoutReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FanoutSender { tx }, FanoutReceiver { rx })
}

/// Producer side. Cheap to clone.
#[derive(Clone, Debug)]
pub struct FanoutSender {
    tx: mpsc::UnboundedSender<RelayMessage>,
}

impl FanoutSender {
    /// Enqueues a message for broadcast.
    ///
    /// # Errors
    ///
    /// Returns `FanoutError::Closed` once the broadcast loop has stopped.
    pub fn send(&self, message: RelayMessage) -> Result<(), FanoutError> {
        self.tx.send(message).map_err(|_| FanoutError::Closed)
    }

    /// Returns whether the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the broadcast loop.
#[derive(Debug)]
pub struct FanoutReceiver {
    rx: mpsc::UnboundedReceiver<RelayMessage>,
}

impl FanoutReceiver {
    /// Waits for the next message in enqueue order.
    ///
    /// Returns `None` when every sender has been dropped.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.rx.recv().await
    }

    /// Takes the next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<RelayMessage> {
        self.rx.try_recv().ok()
    }
}

/// Errors from the fan-out channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FanoutError {
    #[error("Fan-out channel closed")]
    Closed,
}
