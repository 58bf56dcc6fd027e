//! Relay Core - Shared types for the line relay
//!
//! This crate provides the domain primitives shared between the
//! wire protocol (relay-protocol) and the daemon (relayd).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod client;
pub mod connection;

// Re-exports for convenience
pub use client::{ClientRecord, RosterEntry};
pub use connection::ConnectionId;
