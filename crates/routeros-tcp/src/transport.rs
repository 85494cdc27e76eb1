//! TCP communicator implementation

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Notify;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace};

use routeros_transport_traits::{
    Charset, CharsetKind, Charsets, Communicator, Direction, LimitsConfig, Sentence,
    TimeoutConfig, TransportError, TransportResult,
};

use crate::codec::{SentenceCodec, encoded_len};
use crate::config::TcpConfig;

/// Live persistent sockets, keyed by `host:port/identity`.
static POOL: LazyLock<Mutex<HashMap<String, Weak<SharedStream>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Per-key gates serializing the opening of persistent sockets.
static OPENING: LazyLock<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

struct Reader {
    framed: FramedRead<OwnedReadHalf, SentenceCodec>,
    /// A sentence read while checking for data, not yet handed out.
    peeked: Option<Sentence>,
}

impl Reader {
    async fn read(&mut self) -> TransportResult<Sentence> {
        match self.framed.next().await {
            Some(result) => result.map_err(receive_error),
            None => Err(TransportError::ConnectionClosed(
                "peer closed the connection".into(),
            )),
        }
    }

    async fn peek(&mut self) -> TransportResult<()> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read().await?);
        }
        Ok(())
    }

    async fn next_sentence(&mut self) -> TransportResult<Sentence> {
        match self.peeked.take() {
            Some(sentence) => Ok(sentence),
            None => self.read().await,
        }
    }
}

/// Socket failures while reading are reported as receive failures; framing
/// and closed-connection errors keep their own kind.
fn receive_error(err: TransportError) -> TransportError {
    match err {
        TransportError::Io(message) => TransportError::ReceiveFailed(message),
        other => other,
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<u64>,
    direction: Direction,
}

/// One socket, possibly shared by several sessions.
struct SharedStream {
    key: String,
    peer: SocketAddr,
    reader: tokio::sync::Mutex<Reader>,
    writer: tokio::sync::Mutex<FramedWrite<OwnedWriteHalf, SentenceCodec>>,
    lock: Mutex<LockState>,
    released: Notify,
    closed: AtomicBool,
    write_timeout: Option<Duration>,
}

impl SharedStream {
    async fn open(config: &TcpConfig) -> TransportResult<Self> {
        let address = format!("{}:{}", config.host, config.port);
        info!("Connecting to RouterOS API at {}", address);

        let stream = tokio::time::timeout(config.timeouts.connect, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::ConnectionTimeout {
                timeout: config.timeouts.connect,
            })?
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("Failed to connect to {address}: {e}"))
            })?;
        stream.set_nodelay(config.nodelay)?;
        let peer = stream.peer_addr()?;
        let (read, write) = stream.into_split();

        Ok(Self {
            key: config.connection_key(),
            peer,
            reader: tokio::sync::Mutex::new(Reader {
                framed: FramedRead::new(read, SentenceCodec::with_limits(&config.limits)),
                peeked: None,
            }),
            writer: tokio::sync::Mutex::new(FramedWrite::new(
                write,
                SentenceCodec::with_limits(&config.limits),
            )),
            lock: Mutex::new(LockState::default()),
            released: Notify::new(),
            closed: AtomicBool::new(false),
            write_timeout: config.timeouts.write,
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(
                "connection was closed locally".into(),
            ));
        }
        Ok(())
    }

    /// Waits until no other session holds a lock covering `direction`.
    async fn wait_for(&self, session: u64, direction: Direction) {
        loop {
            let released = self.released.notified();
            {
                let state = self.lock.lock();
                match state.owner {
                    None => return,
                    Some(owner) if owner == session => return,
                    Some(_) if !state.direction.intersects(direction) => return,
                    Some(_) => {}
                }
            }
            released.await;
        }
    }

    async fn acquire(&self, session: u64, direction: Direction) -> Direction {
        loop {
            let released = self.released.notified();
            {
                let mut state = self.lock.lock();
                match state.owner {
                    Some(owner) if owner == session => {
                        let previous = state.direction;
                        state.direction = previous.union(direction);
                        return previous;
                    }
                    None if direction == Direction::None => return Direction::None,
                    None => {
                        state.owner = Some(session);
                        state.direction = direction;
                        return Direction::None;
                    }
                    Some(_) => {}
                }
            }
            released.await;
        }
    }

    fn restore(&self, session: u64, previous: Direction) -> TransportResult<()> {
        let mut state = self.lock.lock();
        if state.owner != Some(session) {
            if previous == Direction::None {
                return Ok(());
            }
            return Err(TransportError::Lock(format!(
                "session {session} does not hold the lock"
            )));
        }
        if previous == Direction::None {
            state.owner = None;
        }
        state.direction = previous;
        drop(state);
        self.released.notify_waiters();
        Ok(())
    }

    async fn shutdown(&self) -> TransportResult<bool> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(true);
        }
        {
            let mut pool = POOL.lock();
            if pool
                .get(&self.key)
                .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), self))
            {
                pool.remove(&self.key);
            }
        }
        info!("Closing connection to {}", self.peer);
        let mut writer = self.writer.lock().await;
        match writer.get_mut().shutdown().await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// A session handle onto a TCP connection to a RouterOS API service.
///
/// Non-persistent communicators own their socket. Persistent ones share a
/// socket with every other persistent communicator for the same
/// `host:port/identity`; the socket closes when the last handle is dropped
/// or any handle calls [`close`](Communicator::close).
pub struct TcpCommunicator {
    shared: Arc<SharedStream>,
    session: u64,
    persistent: bool,
    fresh: bool,
    charsets: Mutex<Charsets>,
}

impl fmt::Debug for TcpCommunicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpCommunicator")
            .field("peer", &self.shared.peer)
            .field("session", &self.session)
            .field("persistent", &self.persistent)
            .field("fresh", &self.fresh)
            .field("closed", &self.shared.is_closed())
            .finish_non_exhaustive()
    }
}

impl TcpCommunicator {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> TcpCommunicatorBuilder {
        TcpCommunicatorBuilder::new()
    }

    /// Opens a connection, or joins a live persistent one.
    pub async fn connect(config: &TcpConfig) -> TransportResult<Self> {
        config.validate()?;
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);

        if config.persistent {
            return Self::join_or_open(config, session).await;
        }

        let shared = Arc::new(SharedStream::open(config).await?);
        Ok(Self::attach(shared, session, false, true))
    }

    /// Joins the live socket for the key, or opens it. Concurrent callers
    /// for one key wait on the same gate, so only one of them opens.
    async fn join_or_open(config: &TcpConfig, session: u64) -> TransportResult<Self> {
        let key = config.connection_key();
        let gate = Arc::clone(OPENING.lock().entry(key.clone()).or_default());
        let joined = {
            let _opening = gate.lock().await;
            match Self::pooled(&key) {
                Some(shared) => {
                    debug!(key = %key, session, "Reusing persistent connection");
                    Ok(Self::attach(shared, session, true, false))
                }
                None => SharedStream::open(config).await.map(|stream| {
                    let shared = Arc::new(stream);
                    POOL.lock().insert(key.clone(), Arc::downgrade(&shared));
                    Self::attach(shared, session, true, true)
                }),
            }
        };
        let mut gates = OPENING.lock();
        // Our clone plus the map entry: nobody else is waiting.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(&key);
        }
        joined
    }

    fn pooled(key: &str) -> Option<Arc<SharedStream>> {
        POOL.lock()
            .get(key)
            .and_then(Weak::upgrade)
            .filter(|shared| !shared.is_closed())
    }

    fn attach(shared: Arc<SharedStream>, session: u64, persistent: bool, fresh: bool) -> Self {
        Self {
            shared,
            session,
            persistent,
            fresh,
            charsets: Mutex::new(Charsets::default()),
        }
    }

    /// Returns the address of the router.
    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer
    }

    /// Returns the id this handle uses as lock owner.
    pub const fn session_id(&self) -> u64 {
        self.session
    }

    /// Returns `true` once the socket has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

#[async_trait]
impl Communicator for TcpCommunicator {
    async fn send_sentence(&self, sentence: &Sentence) -> TransportResult<usize> {
        self.shared.wait_for(self.session, Direction::Send).await;
        self.shared.ensure_open()?;
        let mut writer = self.shared.writer.lock().await;
        let write = writer.send(sentence);
        match self.shared.write_timeout {
            Some(limit) => tokio::time::timeout(limit, write).await.map_err(|_| {
                TransportError::SendFailed(format!("write timed out after {limit:?}"))
            })??,
            None => write.await?,
        }
        trace!(session = self.session, words = sentence.len(), "Sentence sent");
        Ok(encoded_len(sentence))
    }

    async fn receive_sentence(&self) -> TransportResult<Sentence> {
        self.shared.wait_for(self.session, Direction::Receive).await;
        let mut reader = self.shared.reader.lock().await;
        let sentence = reader.next_sentence().await?;
        trace!(session = self.session, words = sentence.len(), "Sentence received");
        Ok(sentence)
    }

    async fn is_data_awaiting(&self, timeout: Option<Duration>) -> TransportResult<bool> {
        let wait = async {
            self.shared.wait_for(self.session, Direction::Receive).await;
            let mut reader = self.shared.reader.lock().await;
            reader.peek().await
        };
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result.map(|()| true),
                Err(_) => Ok(false),
            },
            None => wait.await.map(|()| true),
        }
    }

    async fn close(&self) -> TransportResult<bool> {
        self.shared.shutdown().await
    }

    async fn lock(&self, direction: Direction) -> TransportResult<Direction> {
        let previous = self.shared.acquire(self.session, direction).await;
        trace!(session = self.session, %direction, %previous, "Lock acquired");
        Ok(previous)
    }

    async fn unlock(&self, previous: Direction) -> TransportResult<()> {
        self.shared.restore(self.session, previous)
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn is_fresh(&self) -> bool {
        self.fresh
    }

    fn charset(&self, kind: CharsetKind) -> Option<Charset> {
        self.charsets.lock().get(kind)
    }

    fn set_charset(&self, kind: CharsetKind, charset: Option<Charset>) -> Option<Charset> {
        self.charsets.lock().set(kind, charset)
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!("tcp://{}", self.shared.peer))
    }

    fn connection_key(&self) -> Option<String> {
        self.persistent.then(|| self.shared.key.clone())
    }
}

impl Drop for TcpCommunicator {
    fn drop(&mut self) {
        // A dropped handle must not keep other sessions locked out.
        if let Err(e) = self.shared.restore(self.session, Direction::None) {
            debug!(session = self.session, error = %e, "Releasing the lock on drop failed");
        }
    }
}

/// TCP communicator builder
#[derive(Debug, Default)]
pub struct TcpCommunicatorBuilder {
    config: TcpConfig,
}

impl TcpCommunicatorBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the API port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Share the socket with other sessions
    #[must_use]
    pub const fn persistent(mut self, persistent: bool) -> Self {
        self.config.persistent = persistent;
        self
    }

    /// Set the identity part of the sharing key
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.config.identity = identity.into();
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub const fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.connect = timeout;
        self
    }

    /// Replace all timeouts
    #[must_use]
    pub const fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Replace the sentence limits
    #[must_use]
    pub const fn limits(mut self, limits: LimitsConfig) -> Self {
        self.config.limits = limits;
        self
    }

    /// Returns the configuration built so far
    #[must_use]
    pub fn build(self) -> TcpConfig {
        self.config
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> TransportResult<TcpCommunicator> {
        TcpCommunicator::connect(&self.config).await
    }
}
