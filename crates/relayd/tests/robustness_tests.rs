//! Robustness tests for the relay daemon.
//!
//! These tests verify the daemon handles edge cases and error conditions gracefully:
//! - Malformed and empty handshakes
//! - Disconnects before and during the handshake
//! - Oversized lines
//! - Rapid connect/disconnect
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relayd::config::ServerConfig;
use relayd::server::{BroadcastServer, RelayServer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Line limit used by these tests, small enough to exceed cheaply
const TEST_MAX_LINE_BYTES: usize = 256;

// ============================================================================
// Test Helpers
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    state: Arc<BroadcastServer>,
    cancel_token: CancellationToken,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            max_line_bytes: TEST_MAX_LINE_BYTES,
            ..ServerConfig::default()
        };
        let cancel_token = CancellationToken::new();
        let server = RelayServer::bind(&config, cancel_token.clone())
            .await
            .expect("bind server");
        let addr = server.local_addr().expect("local addr");
        let state = server.state();

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer {
            addr,
            state,
            cancel_token,
        }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        TestClient::new(stream)
    }

    async fn join(&self, name: &str, address: &str) -> TestClient {
        let mut client = self.connect().await;
        client.send(&format!("{name}|{address}")).await;
        client.expect_line(&format!("Welcome {name}.")).await;
        client
    }

    async fn wait_for_connections(&self, expected: usize) {
        let start = tokio::time::Instant::now();
        while start.elapsed() < SETTLE_TIMEOUT {
            if self.state.connection_count().await == expected {
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
        panic!(
            "expected {expected} connections, found {}",
            self.state.connection_count().await
        );
    }

    fn shutdown(self) {
        self.cancel_token.cancel();
    }
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let bytes = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(0);
        if bytes == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    async fn expect_line(&mut self, expected: &str) {
        loop {
            match self.recv().await {
                Some(line) if line == expected => return,
                Some(_) => continue,
                None => panic!("stream closed before {expected:?}"),
            }
        }
    }

    /// Drains lines until end of stream, returning them.
    async fn drain_to_eof(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv().await {
            lines.push(line);
        }
        lines
    }
}

// ============================================================================
// Malformed Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_without_delimiter_is_rejected() {
    let server = TestServer::spawn().await;

    let mut client = server.connect().await;
    client.send("just-a-name").await;

    assert!(client.drain_to_eof().await.is_empty());
    assert_eq!(server.state.connection_count().await, 0);
    assert!(server.state.roster().await.is_empty());

    server.shutdown();
}

#[tokio::test]
async fn test_malformed_handshakes_leave_no_phantom_entries() {
    let server = TestServer::spawn().await;
    let mut observer = server.join("observer", "9.9.9.9").await;

    for bad in ["", "   ", "|1.1.1.1", "name|", "a|b|c", "no delimiter"] {
        let mut client = server.connect().await;
        client.send(bad).await;
        assert!(
            client.drain_to_eof().await.is_empty(),
            "handshake {bad:?} should be rejected silently"
        );
    }

    // The server is still up and the observer is still the only peer.
    observer.send("ping").await;
    observer.expect_line("[observer]: ping").await;
    assert_eq!(server.state.connection_count().await, 1);
    assert_eq!(server.state.roster().await.len(), 1);

    server.shutdown();
}

#[tokio::test]
async fn test_disconnect_before_handshake() {
    let server = TestServer::spawn().await;
    let mut observer = server.join("observer", "9.9.9.9").await;

    let silent = server.connect().await;
    drop(silent);

    let mut partial = server.connect().await;
    partial.send_raw(b"half|a-handshake").await;
    drop(partial);

    // Neither session registered, so neither may produce a departure.
    observer.send("after").await;
    observer.expect_line("[observer]: after").await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(server.state.connection_count().await, 1);

    server.shutdown();
}

// ============================================================================
// Limit Tests
// ============================================================================

#[tokio::test]
async fn test_oversized_line_ends_session_with_departure() {
    let server = TestServer::spawn().await;
    let mut observer = server.join("observer", "9.9.9.9").await;
    let mut flooder = server.join("flooder", "6.6.6.6").await;
    server.wait_for_connections(2).await;

    flooder.send(&"x".repeat(TEST_MAX_LINE_BYTES * 2)).await;

    observer.expect_line("flooder left the chat").await;
    server.wait_for_connections(1).await;

    server.shutdown();
}

#[tokio::test]
async fn test_line_at_limit_is_accepted() {
    let server = TestServer::spawn().await;
    let mut client = server.join("exact", "5.5.5.5").await;

    // Text plus newline fills the limit exactly.
    let text = "y".repeat(TEST_MAX_LINE_BYTES - 1);
    client.send(&text).await;
    client.expect_line(&format!("[exact]: {text}")).await;

    server.shutdown();
}

// ============================================================================
// Churn Tests
// ============================================================================

#[tokio::test]
async fn test_rapid_connect_disconnect() {
    let server = TestServer::spawn().await;

    for i in 0..20 {
        let client = server
            .join(&format!("user{i}"), &format!("10.1.0.{i}"))
            .await;
        drop(client);
    }

    server.wait_for_connections(0).await;
    assert!(server.state.roster().await.is_empty());

    // Still accepting after the churn.
    let mut late = server.join("late", "10.2.0.1").await;
    late.send("made it").await;
    late.expect_line("[late]: made it").await;

    server.shutdown();
}

#[tokio::test]
async fn test_each_departure_announced_once() {
    let server = TestServer::spawn().await;
    let mut observer = server.join("observer", "9.9.9.9").await;
    let leaver = server.join("leaver", "8.8.8.8").await;
    server.wait_for_connections(2).await;

    drop(leaver);
    observer.expect_line("leaver left the chat").await;
    server.wait_for_connections(1).await;

    // Push a marker through the channel, then check nothing else mentions the leaver.
    observer.send("marker").await;
    let mut after = Vec::new();
    loop {
        let line = observer.recv().await.expect("observer stays connected");
        if line == "[observer]: marker" {
            break;
        }
        after.push(line);
    }
    assert!(
        !after.iter().any(|line| line == "leaver left the chat"),
        "departure announced twice: {after:?}"
    );

    server.shutdown();
}
