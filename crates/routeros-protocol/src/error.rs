//! Protocol error types.

use routeros_transport_traits::TransportError;
use thiserror::Error;

/// A specialized `Result` type for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building, writing or reading sentences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The command word is malformed.
    #[error("Invalid command '{0}': commands are absolute paths such as /ip/address/print")]
    InvalidCommand(String),

    /// An argument name is empty or contains '='.
    #[error("Invalid argument name '{0}'")]
    InvalidArgumentName(String),

    /// The peer sent a value the protocol does not allow here.
    #[error("Unexpected value: {0}")]
    UnexpectedValue(String),

    /// The peer asked for something this implementation cannot do.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The transport underneath failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProtocolError {
    /// Returns `true` if the error suggests the peer does not speak the
    /// RouterOS API at all.
    pub const fn is_incompatibility(&self) -> bool {
        matches!(self, Self::UnexpectedValue(_) | Self::NotSupported(_))
    }
}
