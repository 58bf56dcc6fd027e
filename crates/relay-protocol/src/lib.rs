//! Relay Protocol - Line protocol for relay communication
//!
//! This crate provides the handshake parser used when a client first
//! connects, and the server-to-client message kinds with their exact
//! line renderings.

pub mod handshake;
pub mod message;

pub use handshake::{parse_handshake, HandshakeError, ParsedHandshake, HANDSHAKE_DELIMITER};
pub use message::{RelayMessage, ROSTER_PREFIX};
