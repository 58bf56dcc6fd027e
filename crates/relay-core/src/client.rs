//! Client identity as announced in the handshake.

use std::fmt;

/// Identity a client claims for itself.
///
/// Neither field is verified: the name is a free-form display name and the
/// address is whatever source address the client chose to report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientRecord {
    /// Display name used in chat and departure lines
    pub name: String,

    /// Reported source address, used as the roster key
    pub address: String,
}

impl ClientRecord {
    /// Creates a new client record.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Returns this client's roster entry.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry::new(self.address.clone(), self.name.clone())
    }
}

/// One `(address, name)` pair in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RosterEntry {
    pub address: String,
    pub name: String,
}

impl RosterEntry {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

/// Renders as `address-name`, the roster wire form.
impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.address, self.name)
    }
}
