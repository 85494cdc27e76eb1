//! TCP communicator configuration.

use routeros_transport_traits::{LimitsConfig, TimeoutConfig, TransportError, TransportResult};
use serde::{Deserialize, Serialize};

/// Default port of the plain-text API service.
pub const DEFAULT_PORT: u16 = 8728;

/// TCP communicator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Router host name or address
    pub host: String,
    /// API service port
    pub port: u16,
    /// Share the socket with other sessions for the same router and user
    pub persistent: bool,
    /// User the connection is authenticated as; part of the sharing key
    pub identity: String,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
    /// Connection and write timeouts
    pub timeouts: TimeoutConfig,
    /// Sentence size limits
    pub limits: LimitsConfig,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            persistent: false,
            identity: String::new(),
            nodelay: true,
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl TcpConfig {
    /// Returns the key under which persistent sockets are shared.
    pub fn connection_key(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.identity)
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> TransportResult<()> {
        if self.host.trim().is_empty() {
            return Err(TransportError::ConfigurationError("host is empty".into()));
        }
        if self.port == 0 {
            return Err(TransportError::ConfigurationError("port must not be 0".into()));
        }
        Ok(())
    }
}
