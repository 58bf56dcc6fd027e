//! Connection identity.

use std::fmt;

/// Stable identity of one accepted connection.
///
/// Assigned by the acceptor from a monotonically increasing counter, so two
/// live connections never share an id. Used as the primary registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection id from a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_ordering_follows_counter() {
        let first = ConnectionId::from(1);
        let second = ConnectionId::from(2);
        assert!(first < second);
        assert_eq!(second.get(), 2);
    }
}
