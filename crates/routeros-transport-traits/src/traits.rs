//! Core transport traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::charset::Charset;
use crate::error::TransportResult;
use crate::sentence::Sentence;
use crate::types::{CharsetKind, Direction};

/// A connection to a router, as seen by one client session.
///
/// A communicator moves whole sentences. Framing, socket handling and
/// sharing of persistent sockets between sessions are its business; the
/// client above it only decides what to send and how to route replies.
///
/// On a persistent connection several communicators may share one socket.
/// [`lock`](Communicator::lock) then grants this session exclusive use of the
/// chosen directions until [`unlock`](Communicator::unlock) restores the
/// previous state. Sessions that do not hold the lock wait inside their I/O
/// calls.
#[async_trait]
pub trait Communicator: Send + Sync + std::fmt::Debug {
    /// Writes one sentence and returns the number of bytes put on the wire.
    async fn send_sentence(&self, sentence: &Sentence) -> TransportResult<usize>;

    /// Reads the next sentence, waiting as long as it takes.
    async fn receive_sentence(&self) -> TransportResult<Sentence>;

    /// Waits until a sentence can be read without blocking.
    ///
    /// Returns `Ok(false)` when `timeout` elapses first. `None` waits
    /// indefinitely.
    async fn is_data_awaiting(&self, timeout: Option<Duration>) -> TransportResult<bool>;

    /// Closes the connection, even a persistent one.
    async fn close(&self) -> TransportResult<bool>;

    /// Locks the given directions for this session and returns the
    /// directions it held before.
    async fn lock(&self, direction: Direction) -> TransportResult<Direction>;

    /// Restores a lock state previously returned by [`lock`](Communicator::lock).
    async fn unlock(&self, previous: Direction) -> TransportResult<()>;

    /// Returns `true` if the underlying socket may be shared by other sessions.
    fn is_persistent(&self) -> bool;

    /// Returns `true` if the socket was opened for this session rather than reused.
    fn is_fresh(&self) -> bool;

    /// Returns the charset of the given kind.
    fn charset(&self, kind: CharsetKind) -> Option<Charset>;

    /// Replaces the charset of the given kind and returns the previous one.
    fn set_charset(&self, kind: CharsetKind, charset: Option<Charset>) -> Option<Charset>;

    /// Returns the endpoint address or identifier, if applicable.
    fn endpoint(&self) -> Option<String> {
        None
    }

    /// Returns the identity shared by every handle onto the same socket.
    ///
    /// Persistent communicators return the key their socket is shared
    /// under; sessions with equal keys must coordinate their tags.
    fn connection_key(&self) -> Option<String> {
        None
    }
}
