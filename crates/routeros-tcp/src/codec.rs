//! Length-prefixed word framing.
//!
//! Every word is preceded by its length, encoded in one to five bytes
//! depending on its magnitude. A zero-length word ends the sentence.

use bytes::{BufMut, Bytes, BytesMut};
use routeros_transport_traits::{
    LimitsConfig, Sentence, TransportError, TransportResult, validate_sentence_size,
};
use tokio_util::codec::{Decoder, Encoder};

/// Codec turning a byte stream into [`Sentence`]s and back.
#[derive(Debug, Clone, Default)]
pub struct SentenceCodec {
    max_sentence_size: Option<usize>,
    /// Bytes of the current partial sentence already scanned.
    cursor: usize,
    /// Payload positions of the words scanned so far.
    words: Vec<(usize, usize)>,
}

impl SentenceCodec {
    /// Creates a codec with the default limits.
    pub fn new() -> Self {
        Self::with_limits(&LimitsConfig::default())
    }

    /// Creates a codec enforcing the given limits on received sentences.
    pub fn with_limits(limits: &LimitsConfig) -> Self {
        Self {
            max_sentence_size: limits.max_sentence_size,
            ..Self::default()
        }
    }

    /// Returns the largest sentence this codec accepts, in bytes.
    pub const fn max_sentence_size(&self) -> Option<usize> {
        self.max_sentence_size
    }
}

/// Returns the number of bytes `sentence` occupies on the wire.
pub fn encoded_len(sentence: &Sentence) -> usize {
    sentence
        .words()
        .iter()
        .map(|w| header_len(w.len()) + w.len())
        .sum::<usize>()
        + 1
}

const fn header_len(len: usize) -> usize {
    if len < 0x80 {
        1
    } else if len < 0x4000 {
        2
    } else if len < 0x20_0000 {
        3
    } else if len < 0x1000_0000 {
        4
    } else {
        5
    }
}

/// Writes the length prefix of a word.
pub(crate) fn encode_length(len: usize, dst: &mut BytesMut) -> TransportResult<()> {
    let value = u32::try_from(len)
        .map_err(|_| TransportError::Framing(format!("word of {len} bytes cannot be framed")))?;
    match header_len(len) {
        1 => dst.put_u8(value as u8),
        2 => dst.put_u16(value as u16 | 0x8000),
        3 => dst.put_slice(&(value | 0xC0_0000).to_be_bytes()[1..]),
        4 => dst.put_u32(value | 0xE000_0000),
        _ => {
            dst.put_u8(0xF0);
            dst.put_u32(value);
        }
    }
    Ok(())
}

/// Reads a length prefix. Returns the word length and the size of the
/// prefix, or `None` if more bytes are needed.
pub(crate) fn decode_length(src: &[u8]) -> TransportResult<Option<(usize, usize)>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    let header = match first {
        0x00..=0x7F => return Ok(Some((usize::from(first), 1))),
        0x80..=0xBF => 2,
        0xC0..=0xDF => 3,
        0xE0..=0xEF => 4,
        0xF0 => 5,
        0xF1..=0xF7 => {
            return Err(TransportError::Framing(format!(
                "malformed length prefix 0x{first:02X}"
            )));
        }
        0xF8..=0xFF => {
            return Err(TransportError::Framing(format!(
                "reserved control byte 0x{first:02X}"
            )));
        }
    };
    if src.len() < header {
        return Ok(None);
    }
    let len = if header == 5 {
        src[1..5]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b))
    } else {
        let mask = (1usize << (7 * header)) - 1;
        src[..header]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b))
            & mask
    };
    Ok(Some((len, header)))
}

impl Decoder for SentenceCodec {
    type Item = Sentence;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> TransportResult<Option<Sentence>> {
        loop {
            let Some((len, header)) = decode_length(&src[self.cursor..])? else {
                return Ok(None);
            };
            let end = self.cursor + header + len;
            validate_sentence_size(end, self.max_sentence_size)?;

            if len == 0 {
                let frame: Bytes = src.split_to(end).freeze();
                let words: Vec<Bytes> = self
                    .words
                    .drain(..)
                    .map(|(start, len)| frame.slice(start..start + len))
                    .collect();
                self.cursor = 0;
                return Ok(Some(Sentence::from_words(words)));
            }
            if src.len() < end {
                src.reserve(end - src.len());
                return Ok(None);
            }
            self.words.push((self.cursor + header, len));
            self.cursor = end;
        }
    }
}

impl Encoder<&Sentence> for SentenceCodec {
    type Error = TransportError;

    fn encode(&mut self, sentence: &Sentence, dst: &mut BytesMut) -> TransportResult<()> {
        if sentence.words().iter().any(Bytes::is_empty) {
            return Err(TransportError::Framing(
                "a zero-length word would end the sentence early".into(),
            ));
        }
        dst.reserve(encoded_len(sentence));
        for word in sentence.words() {
            encode_length(word.len(), dst)?;
            dst.put_slice(word);
        }
        dst.put_u8(0);
        Ok(())
    }
}
