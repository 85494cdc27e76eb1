//! Sentence types.

use std::fmt;

use bytes::Bytes;

/// An ordered list of words exchanged as one unit over a connection.
///
/// The terminating zero-length word is implied by the framing layer and is
/// never part of the word list.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<Bytes>,
}

impl Sentence {
    /// Creates an empty sentence.
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates a sentence from the given words.
    pub fn from_words<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Bytes>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a word.
    pub fn push(&mut self, word: impl Into<Bytes>) {
        self.words.push(word.into());
    }

    /// Returns the words of this sentence.
    pub fn words(&self) -> &[Bytes] {
        &self.words
    }

    /// Consumes the sentence and returns its words.
    pub fn into_words(self) -> Vec<Bytes> {
        self.words
    }

    /// Returns the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the sentence has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the total size of the word payloads in bytes.
    pub fn payload_len(&self) -> usize {
        self.words.iter().map(Bytes::len).sum()
    }
}

impl fmt::Debug for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.words.iter().map(|w| String::from_utf8_lossy(w)))
            .finish()
    }
}

impl<W: Into<Bytes>> FromIterator<W> for Sentence {
    fn from_iter<I: IntoIterator<Item = W>>(iter: I) -> Self {
        Self::from_words(iter)
    }
}

impl IntoIterator for Sentence {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}
