//! A scripted in-memory connection shared by the client integration tests.

#![allow(dead_code, unreachable_pub)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use routeros_client::{Charset, CharsetKind, Communicator, Direction};
use routeros_transport_traits::{Charsets, Sentence, TransportError, TransportResult};

/// The bytes on the wire, as seen by every handle attached to it.
#[derive(Debug, Default)]
pub struct Wire {
    inbound: Mutex<VecDeque<Sentence>>,
    outbound: Mutex<Vec<Sentence>>,
    closed: AtomicBool,
}

/// A communicator that replays queued sentences and records what is sent.
///
/// An empty script reports no data when polled with a timeout and a closed
/// connection when waited on indefinitely.
#[derive(Debug, Clone)]
pub struct Scripted {
    wire: Arc<Wire>,
    persistent: bool,
    fresh: bool,
    key: Option<String>,
    charsets: Arc<Mutex<Charsets>>,
    locks: Arc<Mutex<Vec<(&'static str, Direction)>>>,
    held: Arc<Mutex<Direction>>,
    polls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn new() -> Self {
        Self {
            wire: Arc::new(Wire::default()),
            persistent: false,
            fresh: true,
            key: None,
            charsets: Arc::default(),
            locks: Arc::default(),
            held: Arc::default(),
            polls: Arc::default(),
        }
    }

    /// A persistent handle onto a connection identified by `key`.
    pub fn persistent(key: &str) -> Self {
        Self {
            persistent: true,
            key: Some(key.to_string()),
            ..Self::new()
        }
    }

    /// Another session's handle onto the same wire.
    pub fn attach(&self) -> Self {
        Self {
            wire: Arc::clone(&self.wire),
            persistent: self.persistent,
            fresh: false,
            key: self.key.clone(),
            charsets: Arc::default(),
            locks: Arc::default(),
            held: Arc::default(),
            polls: Arc::default(),
        }
    }

    pub fn queue<S: AsRef<str>>(&self, words: &[S]) {
        let sentence = Sentence::from_words(
            words
                .iter()
                .map(|w| bytes::Bytes::copy_from_slice(w.as_ref().as_bytes())),
        );
        self.wire.inbound.lock().push_back(sentence);
    }

    pub fn queue_raw(&self, sentence: Sentence) {
        self.wire.inbound.lock().push_back(sentence);
    }

    pub fn sent(&self) -> Vec<Vec<String>> {
        self.wire
            .outbound
            .lock()
            .iter()
            .map(|s| {
                s.words()
                    .iter()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .collect()
            })
            .collect()
    }

    pub fn sent_raw(&self) -> Vec<Sentence> {
        self.wire.outbound.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.wire.inbound.lock().len()
    }

    pub fn lock_calls(&self) -> Vec<(&'static str, Direction)> {
        self.locks.lock().clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.wire.closed.load(Ordering::SeqCst)
    }

    pub fn with_charsets(self, local: &str, remote: &str) -> Self {
        *self.charsets.lock() = Charsets {
            local: Charset::for_label(local),
            remote: Charset::for_label(remote),
        };
        self
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.is_closed() {
            Err(TransportError::ConnectionClosed("connection closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Communicator for Scripted {
    async fn send_sentence(&self, sentence: &Sentence) -> TransportResult<usize> {
        self.ensure_open()?;
        self.wire.outbound.lock().push(sentence.clone());
        Ok(sentence.payload_len())
    }

    async fn receive_sentence(&self) -> TransportResult<Sentence> {
        self.ensure_open()?;
        self.wire
            .inbound
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::ConnectionClosed("script exhausted".into()))
    }

    async fn is_data_awaiting(&self, timeout: Option<Duration>) -> TransportResult<bool> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        if !self.wire.inbound.lock().is_empty() {
            return Ok(true);
        }
        match timeout {
            Some(timeout) => {
                tokio::time::sleep(timeout).await;
                Ok(false)
            }
            None => Err(TransportError::ConnectionClosed("script exhausted".into())),
        }
    }

    async fn close(&self) -> TransportResult<bool> {
        self.wire.closed.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn lock(&self, direction: Direction) -> TransportResult<Direction> {
        self.locks.lock().push(("lock", direction));
        let mut held = self.held.lock();
        let previous = *held;
        *held = previous.union(direction);
        Ok(previous)
    }

    async fn unlock(&self, previous: Direction) -> TransportResult<()> {
        self.locks.lock().push(("unlock", previous));
        *self.held.lock() = previous;
        Ok(())
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

    fn connection_key(&self) -> Option<String> {
        self.key.clone()
    }
}

/// Collects the tags of a response sequence, for compact assertions.
pub fn tags(responses: &[routeros_client::Response]) -> Vec<String> {
    responses.iter().map(|r| r.tag().to_string()).collect()
}

/// Installs a test subscriber so `RUST_LOG` works in failing tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
