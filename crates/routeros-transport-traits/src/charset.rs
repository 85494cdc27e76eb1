//! Charset handling for words crossing the connection.
//!
//! The router and the application may work in different charsets. A
//! [`Charsets`] pair holds both; conversion only happens when both are set.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{EncoderResult, Encoding};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::CharsetKind;

/// A named character encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8.
    pub fn utf_8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Resolves a charset from a label such as `"utf-8"` or `"windows-1251"`.
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self)
    }

    /// Returns the canonical name of the charset.
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Returns the underlying encoding.
    pub const fn encoding(self) -> &'static Encoding {
        self.0
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Charset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::for_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown charset label: {label}")))
    }
}

/// The local and remote charsets of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charsets {
    /// The charset the application works in.
    pub local: Option<Charset>,
    /// The charset the router works in.
    pub remote: Option<Charset>,
}

impl Charsets {
    /// Creates a pair with both charsets set.
    pub const fn new(local: Charset, remote: Charset) -> Self {
        Self {
            local: Some(local),
            remote: Some(remote),
        }
    }

    /// Returns the charset of the given kind.
    pub const fn get(&self, kind: CharsetKind) -> Option<Charset> {
        match kind {
            CharsetKind::Local => self.local,
            CharsetKind::Remote => self.remote,
        }
    }

    /// Replaces the charset of the given kind and returns the previous one.
    pub fn set(&mut self, kind: CharsetKind, charset: Option<Charset>) -> Option<Charset> {
        let slot = match kind {
            CharsetKind::Local => &mut self.local,
            CharsetKind::Remote => &mut self.remote,
        };
        std::mem::replace(slot, charset)
    }

    /// Converts bytes from the local to the remote charset.
    pub fn to_remote<'a>(&self, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        match (self.local, self.remote) {
            (Some(local), Some(remote)) if local != remote => {
                Cow::Owned(transcode(bytes, local, remote))
            }
            _ => Cow::Borrowed(bytes),
        }
    }

    /// Converts bytes from the remote to the local charset.
    pub fn to_local<'a>(&self, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        match (self.local, self.remote) {
            (Some(local), Some(remote)) if local != remote => {
                Cow::Owned(transcode(bytes, remote, local))
            }
            _ => Cow::Borrowed(bytes),
        }
    }
}

/// Transliterates `input` from one charset to another.
///
/// Characters that cannot be represented in the target charset are dropped.
pub fn transcode(input: &[u8], from: Charset, to: Charset) -> Vec<u8> {
    let (text, _) = from.0.decode_without_bom_handling(input);
    let mut encoder = to.0.new_encoder();
    let mut output = Vec::with_capacity(input.len());
    let mut buffer = [0u8; 1024];
    let mut remaining: &str = &text;
    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut buffer, true);
        output.extend_from_slice(&buffer[..written]);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            // The encoder consumes unmappable characters; they stay out of the output.
            EncoderResult::OutputFull | EncoderResult::Unmappable(_) => {}
        }
    }
    output
}
