//! Client configuration.
//!
//! Every field has a default taken from [`constants`](crate::constants), so a
//! configuration file only needs to name the values it changes:
//!
//! ```
//! use seedling::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str("listen_port = 51413\ntracker_timeout_ms = 2500").unwrap();
//! assert_eq!(config.listen_port, 51413);
//! assert_eq!(config.tracker_timeout().as_millis(), 2500);
//! assert_eq!(config.max_message_size, seedling::constants::MAX_MESSAGE_SIZE);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Tunables for tracker contacts and peer sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Port announced to trackers as our listening port.
    pub listen_port: u16,
    /// Deadline for each UDP tracker phase.
    pub tracker_timeout_ms: u64,
    /// Deadline for establishing a TCP connection to a peer.
    pub connect_timeout_ms: u64,
    /// Deadline for the peer's handshake reply.
    pub handshake_timeout_ms: u64,
    /// Maximum idle time between framed messages.
    pub read_timeout_ms: u64,
    /// Deadline for writing a handshake or frame.
    pub write_timeout_ms: u64,
    /// Largest frame accepted from a peer, in bytes.
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            listen_port: constants::DEFAULT_PORT,
            tracker_timeout_ms: millis(constants::UDP_TRACKER_TIMEOUT),
            connect_timeout_ms: millis(constants::CONNECTION_TIMEOUT),
            handshake_timeout_ms: millis(constants::HANDSHAKE_TIMEOUT),
            read_timeout_ms: millis(constants::PEER_READ_TIMEOUT),
            write_timeout_ms: millis(constants::PEER_WRITE_TIMEOUT),
            max_message_size: constants::MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Renders the configuration as TOML, e.g. to write out a starting file.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn tracker_timeout(&self) -> Duration {
        Duration::from_millis(self.tracker_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
