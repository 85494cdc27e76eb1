//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection was closed, either locally or by the peer.
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Failed to send a sentence.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a sentence.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The byte stream does not follow the word framing rules.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Connection establishment timed out.
    #[error(
        "Connection timed out after {timeout:?}. \
         If this is expected, increase the timeout with \
         `TimeoutConfig {{ connect: Duration::from_secs({}) }}`",
        timeout.as_secs() * 2
    )]
    ConnectionTimeout {
        /// The timeout duration that was exceeded
        timeout: Duration,
    },

    /// The transport was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A lock request could not be honoured.
    #[error("Lock error: {0}")]
    Lock(String),

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),

    /// Sentence size exceeds the configured maximum limit.
    #[error(
        "Sentence size ({size} bytes) exceeds maximum allowed ({max} bytes). \
         If this is expected, increase the limit with \
         `LimitsConfig {{ max_sentence_size: Some({}) }}`",
        size
    )]
    SentenceTooLarge {
        /// The actual size of the sentence in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max: usize,
    },
}

impl TransportError {
    /// Returns `true` when the error means the connection can no longer be used.
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::ConnectionClosed(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Validates a sentence size against the configured limit.
pub fn validate_sentence_size(size: usize, max: Option<usize>) -> TransportResult<()> {
    match max {
        Some(max) if size > max => Err(TransportError::SentenceTooLarge { size, max }),
        _ => Ok(()),
    }
}
