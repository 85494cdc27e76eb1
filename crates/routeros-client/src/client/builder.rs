//! Client builder pattern for RouterOS sessions
//!
//! Provides a fluent interface over [`ClientConfig`] for opening a
//! connection and logging in.

use std::time::Duration;

use routeros_tcp::TcpCommunicator;
use routeros_transport_traits::{CharsetKind, Communicator};
use tracing::debug;

use super::config::ClientConfig;
use super::core::Client;
use crate::error::Result;

/// Builder for configuring and connecting clients
///
/// # Examples
///
/// ```rust,no_run
/// use routeros_client::ClientBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> routeros_client::Result<()> {
/// let client = ClientBuilder::new("192.168.88.1")
///     .credentials("admin", "secret")
///     .persistent(true)
///     .connect_timeout(Duration::from_secs(5))
///     .remote_charset("windows-1251")
///     .connect()
///     .await?;
/// # client.release().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder for the router at `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                host: host.into(),
                ..ClientConfig::default()
            },
        }
    }

    /// Create a builder from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the API port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the login name and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Share the connection with other sessions of the same user
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.config.persistent = persistent;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the write timeout; `None` waits indefinitely
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.write_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Set the charset the application works in
    pub fn local_charset(mut self, label: impl Into<String>) -> Self {
        self.config.local_charset = Some(label.into());
        self
    }

    /// Set the charset the router works in
    pub fn remote_charset(mut self, label: impl Into<String>) -> Self {
        self.config.remote_charset = Some(label.into());
        self
    }

    /// Keep attribute values as raw bytes
    pub fn streaming_responses(mut self, streaming: bool) -> Self {
        self.config.streaming_responses = streaming;
        self
    }

    /// Limit the size of sentences accepted from the router
    pub fn max_sentence_size(mut self, max: Option<usize>) -> Self {
        self.config.max_sentence_size = max;
        self
    }

    /// Returns the configuration built so far
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates and returns the configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Connects and logs in
    pub async fn connect(self) -> Result<Client<TcpCommunicator>> {
        Client::connect(&self.config).await
    }
}

impl Client<TcpCommunicator> {
    /// Connects to a router over TCP and logs in.
    ///
    /// A persistent session reuses an open connection of the same user and
    /// skips the login.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let charsets = config.charsets()?;
        let com = TcpCommunicator::connect(&config.tcp_config()).await?;
        com.set_charset(CharsetKind::Local, charsets.local);
        com.set_charset(CharsetKind::Remote, charsets.remote);
        debug!(
            host = %config.host,
            port = config.port,
            fresh = com.is_fresh(),
            "Connected"
        );

        let mut client = Self::with_login(com, &config.username, &config.password).await?;
        client.set_streaming_responses(config.streaming_responses);
        Ok(client)
    }
}

/// Shorthand for [`ClientBuilder::new`] with credentials.
pub fn builder(host: impl Into<String>, username: &str, password: &str) -> ClientBuilder {
    ClientBuilder::new(host).credentials(username, password)
}

impl From<ClientConfig> for ClientBuilder {
    fn from(config: ClientConfig) -> Self {
        Self::from_config(config)
    }
}
