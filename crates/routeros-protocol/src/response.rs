//! Incoming responses.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use routeros_transport_traits::{CharsetKind, Charsets, Communicator, Sentence};
use tracing::trace;

use crate::TAG_PREFIX;
use crate::error::{ProtocolError, ProtocolResult};
use crate::registry::Registry;

/// The kind of a response, taken from its first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// `!re`: one item of data.
    Data,
    /// `!trap`: the command failed; a final response follows.
    Error,
    /// `!done`: the last response for a request.
    Final,
    /// `!fatal`: the router is closing the connection.
    Fatal,
}

impl ResponseType {
    /// Parses the first word of a response sentence.
    pub fn from_word(word: &[u8]) -> Option<Self> {
        match word {
            b"!re" => Some(Self::Data),
            b"!trap" => Some(Self::Error),
            b"!done" => Some(Self::Final),
            b"!fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Returns the word this type is written as.
    pub const fn as_word(self) -> &'static str {
        match self {
            Self::Data => "!re",
            Self::Error => "!trap",
            Self::Final => "!done",
            Self::Fatal => "!fatal",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_word())
    }
}

/// The value of a response attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    /// Text decoded into the local charset.
    Text(String),
    /// Raw bytes as the router sent them, for streaming clients.
    Stream(Bytes),
}

impl ArgumentValue {
    /// Returns the value as text, decoding streamed bytes lossily.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Stream(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Returns the value as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Stream(bytes) => bytes,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// One reply sentence from the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    response_type: ResponseType,
    tag: String,
    attributes: Vec<(String, ArgumentValue)>,
    unrecognized_words: Vec<Bytes>,
}

impl Response {
    /// Creates a response with no attributes.
    pub fn new(response_type: ResponseType, tag: impl Into<String>) -> Self {
        Self {
            response_type,
            tag: tag.into(),
            attributes: Vec::new(),
            unrecognized_words: Vec::new(),
        }
    }

    /// Returns the response with a text attribute added.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .push((name.into(), ArgumentValue::Text(value.into())));
        self
    }

    /// Parses a received sentence.
    ///
    /// Attribute values are converted from the remote to the local charset,
    /// except in streaming mode where the raw bytes are kept.
    pub fn from_sentence(
        sentence: Sentence,
        streaming: bool,
        charsets: &Charsets,
    ) -> ProtocolResult<Self> {
        let mut words = sentence.into_iter();
        let first = words
            .next()
            .ok_or_else(|| ProtocolError::UnexpectedValue("empty response sentence".into()))?;
        let response_type = ResponseType::from_word(&first).ok_or_else(|| {
            ProtocolError::UnexpectedValue(format!(
                "unknown response type '{}'",
                String::from_utf8_lossy(&first)
            ))
        })?;

        let mut response = Self::new(response_type, String::new());
        for word in words {
            if let Some(tag) = word.strip_prefix(TAG_PREFIX.as_bytes()) {
                response.tag = String::from_utf8_lossy(tag).into_owned();
            } else if word.first() == Some(&b'=') {
                let (name, value) = split_attribute(&word);
                let value = if streaming {
                    ArgumentValue::Stream(value)
                } else {
                    ArgumentValue::Text(
                        String::from_utf8_lossy(&charsets.to_local(&value)).into_owned(),
                    )
                };
                response.set_attribute(name, value);
            } else {
                response.unrecognized_words.push(word);
            }
        }
        Ok(response)
    }

    /// Reads one response from the connection.
    pub async fn receive<C>(com: &C, streaming: bool) -> ProtocolResult<Self>
    where
        C: Communicator + ?Sized,
    {
        let charsets = Charsets {
            local: com.charset(CharsetKind::Local),
            remote: com.charset(CharsetKind::Remote),
        };
        let sentence = com.receive_sentence().await?;
        Self::from_sentence(sentence, streaming, &charsets)
    }

    /// Takes the next response for a session sharing its connection.
    ///
    /// A response parked for this session by others is returned without
    /// touching the connection. Otherwise exactly one sentence is read; if
    /// another session owns it, it is handed to the registry and `None` is
    /// returned, so the caller can decide whether to wait for more.
    pub async fn receive_routed<C>(
        com: &C,
        streaming: bool,
        registry: &dyn Registry,
    ) -> ProtocolResult<Option<Self>>
    where
        C: Communicator + ?Sized,
    {
        if let Some(parked) = registry.take_parked() {
            trace!(tag = %parked.tag, "Delivering parked response");
            return Ok(Some(parked));
        }
        let response = Self::receive(com, streaming).await?;
        Ok(registry.route(response))
    }

    /// Returns the response type.
    pub const fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Returns the tag; empty for untagged responses.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the value of an attribute.
    pub fn argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns all attributes in the order they were received.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &ArgumentValue)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns words that are neither attributes nor the tag, such as the
    /// reason of a `!fatal` response.
    pub fn unrecognized_words(&self) -> &[Bytes] {
        &self.unrecognized_words
    }

    /// Removes the first `len` bytes of the tag.
    pub(crate) fn strip_tag_prefix(&mut self, len: usize) {
        self.tag = self.tag.get(len..).unwrap_or_default().to_string();
    }

    fn set_attribute(&mut self, name: String, value: ArgumentValue) {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name, value)),
        }
    }
}

/// Splits `=name=value` into its parts. A word without a second `=` is an
/// attribute with an empty value.
fn split_attribute(word: &Bytes) -> (String, Bytes) {
    let body = word.slice(1..);
    match body.iter().position(|b| *b == b'=') {
        Some(at) => (
            String::from_utf8_lossy(&body[..at]).into_owned(),
            body.slice(at + 1..),
        ),
        None => (String::from_utf8_lossy(&body).into_owned(), Bytes::new()),
    }
}
