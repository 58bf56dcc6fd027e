//! Relay Daemon - Connection registry and broadcast server
//!
//! This crate provides the core infrastructure for the relay daemon:
//! - `registry` - Shared map of live connections and the roster
//! - `fanout` - FIFO channel from sessions to the broadcast loop
//! - `server` - TCP acceptor, per-connection sessions and the broadcast loop
//! - `config` - Listen address and per-connection limits
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       relayd daemon                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   RelayServer   │────▶│      BroadcastServer        │   │
//! │  │  (TcpListener)  │     │  (Registry + fan-out tx)    │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ messages          │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ SessionHandler  │     │      Broadcast loop         │   │
//! │  │  (per client)   │     │  (single fan-out consumer)  │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod fanout;
pub mod registry;
pub mod server;
