//! Connection registry.
//!
//! The registry is the only shared mutable state in the daemon. It maps each
//! live connection to its display name and writer, and separately maps each
//! reported address to a display name for roster rendering. Both maps sit
//! behind one `tokio::sync::Mutex`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  register/deregister  ┌──────────────────────────┐
//! │ SessionHandler  │──────────────────────▶│        Registry          │
//! │  (per client)   │◀──── snapshot ────────│ by_connection: id → name │
//! └─────────────────┘                       │ by_address: addr → name  │
//!                                           └────────────┬─────────────┘
//!                                                        │ for_each_connection
//!                                                        ▼
//!                                           ┌──────────────────────────┐
//!                                           │     Broadcast loop       │
//!                                           └──────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - Removal of an absent entry is a no-op, never an error
//! - A failed write to one connection never aborts delivery to the rest

mod store;
mod writer;

pub use store::{ConnectionEntry, DeliveryReport, Registry};
pub use writer::{peer_writer, write_line, BoxedWriter, DeliveryError, PeerWriter};
