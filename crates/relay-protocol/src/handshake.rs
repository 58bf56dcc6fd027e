//! Handshake line parsing.
//!
//! The first line a client sends is `<name>|<address>`. Anything else is
//! rejected with a typed error so the session can be closed without ever
//! touching the registry.

use std::fmt;

use relay_core::ClientRecord;
use thiserror::Error;

/// Separator between the display name and the reported address.
pub const HANDSHAKE_DELIMITER: char = '|';

/// A successfully parsed handshake line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHandshake {
    pub name: String,
    pub address: String,
}

impl ParsedHandshake {
    /// Converts into the client record stored by the registry.
    pub fn into_record(self) -> ClientRecord {
        ClientRecord::new(self.name, self.address)
    }
}

/// Renders the handshake line without the trailing newline.
impl fmt::Display for ParsedHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, HANDSHAKE_DELIMITER, self.address)
    }
}

/// Reasons a handshake line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("Handshake line is empty")]
    Empty,

    #[error("Handshake is missing the '|' delimiter")]
    MissingDelimiter,

    #[error("Handshake contains more than one '|' delimiter")]
    ExtraDelimiter,

    #[error("Handshake name is empty")]
    EmptyName,

    #[error("Handshake address is empty")]
    EmptyAddress,
}

/// Parses a handshake line into a name and a reported address.
///
/// Surrounding whitespace (including the line terminator) is ignored, both
/// for the whole line and for each half.
///
/// # Errors
///
/// Returns a [`HandshakeError`] unless the line contains exactly one
/// delimiter with a non-empty value on each side.
pub fn parse_handshake(line: &str) -> Result<ParsedHandshake, HandshakeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(HandshakeError::Empty);
    }

    let (name, address) = line
        .split_once(HANDSHAKE_DELIMITER)
        .ok_or(HandshakeError::MissingDelimiter)?;

    if address.contains(HANDSHAKE_DELIMITER) {
        return Err(HandshakeError::ExtraDelimiter);
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(HandshakeError::EmptyName);
    }

    let address = address.trim();
    if address.is_empty() {
        return Err(HandshakeError::EmptyAddress);
    }

    Ok(ParsedHandshake {
        name: name.to_string(),
        address: address.to_string(),
    })
}
