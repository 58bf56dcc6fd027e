//! Daemon configuration.
//!
//! Values resolve in order: built-in defaults, an optional TOML file, then
//! an explicit listen address (from `--listen` or `RELAY_LISTEN`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum accepted input line (1 MB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576;

/// Per-connection write timeout during fan-out (10 seconds)
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Runtime configuration for the relay daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub listen: SocketAddr,

    /// Longest input line accepted from a client, terminator included
    pub max_line_bytes: usize,

    /// Upper bound on a single fan-out write to one connection
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolves the effective configuration.
    ///
    /// `listen` overrides whatever the file (or the default) specified.
    pub fn resolve(file: Option<&Path>, listen: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(listen) = listen {
            config.listen = listen;
        }
        Ok(config)
    }

    /// Returns the write timeout as a `Duration`.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_line_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_line_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "write_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
