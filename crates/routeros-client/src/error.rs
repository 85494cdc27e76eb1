//! Client error types.
//!
//! Every error carries a stable numeric [`code`](Error::code) and a coarse
//! [`kind`](Error::kind), so callers can branch without matching on
//! individual variants.

use std::fmt;

use routeros_protocol::ProtocolError;
use routeros_transport_traits::TransportError;
use thiserror::Error;

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An asynchronous request was submitted without a tag.
    #[error("Asynchronous requests must have a tag")]
    MissingTag,

    /// A request was submitted with the tag of a request still active.
    #[error("There must not be multiple active requests sharing the tag '{0}'")]
    DuplicateTag(String),

    /// A value passed to the client is not acceptable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Responses were asked for a tag that is not active.
    #[error("No such request '{0}', or the request has already finished")]
    NoSuchRequest(String),

    /// A tag that is not active was to be canceled.
    #[error("No such request '{0}'; canceling aborted")]
    CancelUnknown(String),

    /// Nothing arrived before the timeout elapsed.
    #[error("No responses within the time limit")]
    NoResponseWithinTimeLimit,

    /// The router rejected the username or password.
    #[error("Invalid username or password supplied")]
    InvalidCredentials,

    /// The peer does not speak the RouterOS API.
    #[error("This is not a compatible RouterOS service")]
    IncompatibleService(#[source] Box<Error>),

    /// The connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A sentence could not be built or understood.
    #[error(transparent)]
    Protocol(ProtocolError),
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Transport(inner) => Self::Transport(inner),
            other => Self::Protocol(other),
        }
    }
}

/// Broad classes of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requests used in an order the client cannot honour.
    DataFlow,
    /// A value was rejected before anything was sent.
    InvalidArgument,
    /// The connection failed or timed out.
    Socket,
    /// A sentence violated the protocol.
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataFlow => write!(f, "data flow"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Socket => write!(f, "socket"),
            Self::Protocol => write!(f, "protocol"),
        }
    }
}

impl Error {
    /// Returns the stable numeric code of this error.
    pub const fn code(&self) -> u32 {
        match self {
            Self::InvalidCredentials => 10000,
            Self::IncompatibleService(_) => 10200,
            Self::Protocol(_) => 10300,
            Self::MissingTag => 10500,
            Self::DuplicateTag(_) => 10501,
            Self::InvalidArgument(_) => 10502,
            Self::NoSuchRequest(_) => 10900,
            Self::CancelUnknown(_) => 11200,
            Self::NoResponseWithinTimeLimit => 11800,
            Self::Transport(TransportError::ConnectionClosed(_)) => 40900,
            Self::Transport(TransportError::ConnectionTimeout { .. }) => 40800,
            Self::Transport(_) => 40000,
        }
    }

    /// Returns the class of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingTag
            | Self::DuplicateTag(_)
            | Self::NoSuchRequest(_)
            | Self::CancelUnknown(_)
            | Self::InvalidCredentials => ErrorKind::DataFlow,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NoResponseWithinTimeLimit
            | Self::IncompatibleService(_)
            | Self::Transport(_) => ErrorKind::Socket,
            Self::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// Returns `true` for the error raised when no response arrived in time.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::NoResponseWithinTimeLimit)
    }

    /// Returns `true` if the connection is gone.
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self, Self::Transport(TransportError::ConnectionClosed(_)))
    }
}
