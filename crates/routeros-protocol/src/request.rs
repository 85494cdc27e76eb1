//! Outgoing requests.

use bytes::{BufMut, Bytes, BytesMut};
use routeros_transport_traits::{CharsetKind, Charsets, Communicator, Sentence};
use tracing::trace;

use crate::TAG_PREFIX;
use crate::error::{ProtocolError, ProtocolResult};
use crate::registry::Registry;

/// A command for the router, with its arguments, queries and tag.
///
/// A request is plain data; writing it does not consume it, so the same
/// request can be sent to several connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    tag: String,
    arguments: Vec<(String, Bytes)>,
    queries: Vec<String>,
}

impl Request {
    /// Creates an untagged request.
    ///
    /// The command is an absolute menu path. The console form with spaces
    /// (`/ip address print`) is accepted and normalized to
    /// `/ip/address/print`.
    pub fn new(command: impl AsRef<str>) -> ProtocolResult<Self> {
        Ok(Self {
            command: normalize_command(command.as_ref())?,
            tag: String::new(),
            arguments: Vec::new(),
            queries: Vec::new(),
        })
    }

    /// Returns the request with its tag replaced.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Replaces the tag. An empty tag makes the request untagged.
    pub fn set_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag = tag.into();
        self
    }

    /// Returns the request with an argument set.
    pub fn with_argument(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<[u8]>,
    ) -> ProtocolResult<Self> {
        self.set_argument(name, value)?;
        Ok(self)
    }

    /// Sets an argument, replacing any previous value of the same name.
    ///
    /// Values are taken in the local charset and converted when the request
    /// is sent.
    pub fn set_argument(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<[u8]>,
    ) -> ProtocolResult<&mut Self> {
        let name = name.as_ref();
        if name.is_empty() || name.contains('=') {
            return Err(ProtocolError::InvalidArgumentName(name.to_string()));
        }
        let value = Bytes::copy_from_slice(value.as_ref());
        match self.arguments.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.arguments.push((name.to_string(), value)),
        }
        Ok(self)
    }

    /// Removes an argument and returns its value.
    pub fn remove_argument(&mut self, name: &str) -> Option<Bytes> {
        let index = self.arguments.iter().position(|(n, _)| n == name)?;
        Some(self.arguments.remove(index).1)
    }

    /// Returns the value of an argument.
    pub fn argument(&self, name: &str) -> Option<&[u8]> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_ref())
    }

    /// Returns the request with a query word appended.
    ///
    /// Query words are written verbatim after the arguments; a leading `?`
    /// is added when missing.
    #[must_use]
    pub fn with_query(mut self, word: impl Into<String>) -> Self {
        let word = word.into();
        if word.starts_with('?') {
            self.queries.push(word);
        } else {
            self.queries.push(format!("?{word}"));
        }
        self
    }

    /// Returns the command word.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the tag; empty for untagged requests.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the arguments in insertion order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.arguments.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }

    /// Builds the sentence for this request.
    ///
    /// With a registry outside tagless mode the tag is prefixed with the
    /// ownership tag, and untagged requests receive the bare ownership tag.
    pub fn to_sentence(&self, charsets: &Charsets, registry: Option<&dyn Registry>) -> Sentence {
        let mut sentence = Sentence::new();
        sentence.push(self.command.clone());
        for (name, value) in &self.arguments {
            let value = charsets.to_remote(value);
            let mut word = BytesMut::with_capacity(name.len() + value.len() + 2);
            word.put_u8(b'=');
            word.put_slice(name.as_bytes());
            word.put_u8(b'=');
            word.put_slice(&value);
            sentence.push(word.freeze());
        }
        for query in &self.queries {
            sentence.push(Bytes::copy_from_slice(&charsets.to_remote(query.as_bytes())));
        }

        let tag = match registry {
            Some(registry) if !registry.is_tagless_mode() => {
                Some(format!("{}{}", registry.ownership_tag(), self.tag))
            }
            _ if !self.tag.is_empty() => Some(self.tag.clone()),
            _ => None,
        };
        if let Some(tag) = tag {
            sentence.push(format!("{TAG_PREFIX}{tag}"));
        }
        sentence
    }

    /// Writes the request and returns the number of bytes sent.
    pub async fn send<C>(&self, com: &C, registry: Option<&dyn Registry>) -> ProtocolResult<usize>
    where
        C: Communicator + ?Sized,
    {
        let charsets = Charsets {
            local: com.charset(CharsetKind::Local),
            remote: com.charset(CharsetKind::Remote),
        };
        let sentence = self.to_sentence(&charsets, registry);
        trace!(command = %self.command, tag = %self.tag, words = sentence.len(), "Sending request");
        Ok(com.send_sentence(&sentence).await?)
    }
}

fn normalize_command(command: &str) -> ProtocolResult<String> {
    let invalid = || ProtocolError::InvalidCommand(command.to_string());
    let trimmed = command.trim();
    if !trimmed.starts_with('/') || trimmed.contains('=') {
        return Err(invalid());
    }
    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join("/");
    if normalized.len() < 2 || normalized.contains("//") || normalized.ends_with('/') {
        return Err(invalid());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use routeros_transport_traits::Charset;

    fn words(sentence: &Sentence) -> Vec<String> {
        sentence
            .words()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    #[test]
    fn test_command_normalization() {
        assert_eq!(Request::new("/ip/address/print").unwrap().command(), "/ip/address/print");
        assert_eq!(Request::new(" /ip address  print ").unwrap().command(), "/ip/address/print");
        assert_eq!(Request::new("/login").unwrap().command(), "/login");
    }

    #[test]
    fn test_invalid_commands() {
        for command in ["", "/", "ip/address", "/ip//address", "/ip/", "/ip=1"] {
            assert!(
                matches!(Request::new(command), Err(ProtocolError::InvalidCommand(_))),
                "{command:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_argument_names() {
        let mut request = Request::new("/login").unwrap();
        assert!(request.set_argument("", "x").is_err());
        assert!(request.set_argument("a=b", "x").is_err());
        request.set_argument("name", "admin").unwrap();
        request.set_argument("name", "root").unwrap();
        assert_eq!(request.argument("name"), Some(&b"root"[..]));
        assert_eq!(request.arguments().count(), 1);
        assert_eq!(request.remove_argument("name").as_deref(), Some(&b"root"[..]));
        assert_eq!(request.argument("name"), None);
    }

    #[test]
    fn test_sentence_layout() {
        let request = Request::new("/interface/print")
            .unwrap()
            .with_argument(".proplist", "name,type")
            .unwrap()
            .with_query("type=ether")
            .with_query("?#|")
            .with_tag("ifaces");
        let sentence = request.to_sentence(&Charsets::default(), None);
        assert_eq!(
            words(&sentence),
            vec![
                "/interface/print",
                "=.proplist=name,type",
                "?type=ether",
                "?#|",
                ".tag=ifaces"
            ]
        );
    }

    #[test]
    fn test_untagged_sentence_has_no_tag_word() {
        let sentence = Request::new("/quit").unwrap().to_sentence(&Charsets::default(), None);
        assert_eq!(words(&sentence), vec!["/quit"]);
    }

    #[test]
    fn test_argument_values_are_transcoded() {
        let cp1251 = Charset::for_label("windows-1251").unwrap();
        let charsets = Charsets::new(Charset::utf_8(), cp1251);
        let request = Request::new("/system/identity/set")
            .unwrap()
            .with_argument("name", "роутер")
            .unwrap();
        let sentence = request.to_sentence(&charsets, None);
        let mut expected = b"=name=".to_vec();
        expected.extend_from_slice(&[0xF0, 0xEE, 0xF3, 0xF2, 0xE5, 0xF0]);
        assert_eq!(sentence.words()[1].as_ref(), expected.as_slice());
    }
}
