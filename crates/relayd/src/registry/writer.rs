//! Shared write handles for registered connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Type-erased write half of a client connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Type alias for a connection's writer handle.
///
/// Shared between the owning session (which closes it on teardown) and the
/// broadcast loop (which writes every fan-out message through it).
pub type PeerWriter = Arc<Mutex<BufWriter<BoxedWriter>>>;

/// Wraps a raw write half into a shareable [`PeerWriter`].
pub fn peer_writer<W>(writer: W) -> PeerWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(BufWriter::new(Box::new(writer))))
}

/// Errors that can occur while delivering a line to one connection.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Write timed out after {0:?}")]
    Timeout(Duration),
}

/// Writes `line` verbatim and flushes, bounded by `write_timeout`.
///
/// The caller supplies the line terminator.
pub async fn write_line(
    writer: &PeerWriter,
    line: &str,
    write_timeout: Duration,
) -> Result<(), DeliveryError> {
    let mut writer = writer.lock().await;

    match timeout(write_timeout, async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok::<(), std::io::Error>(())
    })
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeliveryError::Io(e.to_string())),
        Err(_) => Err(DeliveryError::Timeout(write_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_line_flushes() {
        let (client, mut server) = tokio::io::duplex(64);
        let writer = peer_writer(client);

        write_line(&writer, "hello\n", Duration::from_secs(1))
            .await
            .unwrap();

        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let writer = peer_writer(client);

        let result = write_line(&writer, "lost\n", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DeliveryError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_peer_times_out() {
        // Nobody drains the 8-byte duplex buffer, so the write stalls.
        let (client, _server) = tokio::io::duplex(8);
        let writer = peer_writer(client);
        let line = "x".repeat(64);

        let result = write_line(&writer, &line, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(DeliveryError::Timeout(_))));
    }
}
