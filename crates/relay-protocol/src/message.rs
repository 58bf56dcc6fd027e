//! Server-to-client message kinds.
//!
//! Every message is plain text. The broadcast loop writes the rendered
//! message followed by a single newline, so a welcome (which already ends
//! in a newline) shows up as four lines on the client, the last one empty.

use std::fmt;

use relay_core::RosterEntry;

/// Prefix that marks a roster line.
pub const ROSTER_PREFIX: &str = "metadata|";

/// Separator between roster entries.
const ROSTER_SEPARATOR: &str = ",";

/// A fully formed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// Greeting broadcast when a client registers
    Welcome { name: String },

    /// Snapshot of every connected peer
    Roster { entries: Vec<RosterEntry> },

    /// One line of chat from a named client
    Chat { name: String, text: String },

    /// Announcement that a client's session ended
    Departure { name: String },
}

impl RelayMessage {
    /// Creates a welcome message.
    pub fn welcome(name: impl Into<String>) -> Self {
        Self::Welcome { name: name.into() }
    }

    /// Creates a roster message.
    ///
    /// Returns `None` for an empty roster: no roster line is ever sent
    /// without at least one entry.
    pub fn roster(entries: Vec<RosterEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self::Roster { entries })
        }
    }

    /// Creates a chat message.
    pub fn chat(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Chat {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Creates a departure message.
    pub fn departure(name: impl Into<String>) -> Self {
        Self::Departure { name: name.into() }
    }

    /// Renders the message as it is written to the wire, newline included.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { name } => write!(
                f,
                "Welcome {name}.\n\
                 Type '/peers' to reveal all connected peer\n\
                 Type '/connected 1' to connect to #1 peer\n"
            ),
            Self::Roster { entries } => {
                f.write_str(ROSTER_PREFIX)?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(ROSTER_SEPARATOR)?;
                    }
                    write!(f, "{entry}")?;
                }
                Ok(())
            }
            Self::Chat { name, text } => write!(f, "[{name}]: {text}"),
            Self::Departure { name } => write!(f, "{name} left the chat"),
        }
    }
}
