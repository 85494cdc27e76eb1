//! Client configuration.

use std::fmt;
use std::time::Duration;

use routeros_tcp::{DEFAULT_PORT, TcpConfig};
use routeros_transport_traits::{Charset, Charsets, LimitsConfig, TimeoutConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Everything needed to open and log in a client session.
///
/// Deserializes from any serde source; missing fields take their defaults.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Router host name or address
    pub host: String,
    /// API service port
    pub port: u16,
    /// Login name
    pub username: String,
    /// Login password
    pub password: String,
    /// Share the connection with other sessions of the same user
    pub persistent: bool,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Write timeout in milliseconds; `None` waits indefinitely
    pub write_timeout_ms: Option<u64>,
    /// Charset label of the application, such as `utf-8`
    pub local_charset: Option<String>,
    /// Charset label of the router, such as `windows-1251`
    pub remote_charset: Option<String>,
    /// Keep attribute values as raw bytes
    pub streaming_responses: bool,
    /// Largest sentence accepted from the router, in bytes
    pub max_sentence_size: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: "admin".to_string(),
            password: String::new(),
            persistent: false,
            connect_timeout_ms: timeouts.connect.as_millis() as u64,
            write_timeout_ms: timeouts.write.map(|t| t.as_millis() as u64),
            local_charset: None,
            remote_charset: None,
            streaming_responses: false,
            max_sentence_size: LimitsConfig::default().max_sentence_size,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("persistent", &self.persistent)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .field("local_charset", &self.local_charset)
            .field("remote_charset", &self.remote_charset)
            .field("streaming_responses", &self.streaming_responses)
            .field("max_sentence_size", &self.max_sentence_size)
            .finish()
    }
}

impl ClientConfig {
    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidArgument("host must not be empty".into()));
        }
        if self.username.is_empty() {
            return Err(Error::InvalidArgument("username must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::InvalidArgument("port must not be 0".into()));
        }
        self.charsets()?;
        Ok(())
    }

    /// Resolves the configured charset labels.
    pub fn charsets(&self) -> Result<Charsets> {
        let resolve = |label: &Option<String>| -> Result<Option<Charset>> {
            label
                .as_deref()
                .map(|l| {
                    Charset::for_label(l)
                        .ok_or_else(|| Error::InvalidArgument(format!("unknown charset '{l}'")))
                })
                .transpose()
        };
        Ok(Charsets {
            local: resolve(&self.local_charset)?,
            remote: resolve(&self.remote_charset)?,
        })
    }

    /// Returns the transport configuration for this client.
    pub fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            host: self.host.clone(),
            port: self.port,
            persistent: self.persistent,
            identity: self.username.clone(),
            timeouts: TimeoutConfig {
                connect: Duration::from_millis(self.connect_timeout_ms),
                write: self.write_timeout_ms.map(Duration::from_millis),
            },
            limits: LimitsConfig {
                max_sentence_size: self.max_sentence_size,
            },
            ..TcpConfig::default()
        }
    }
}
