//! Ordered sets of responses.

use std::ops::Deref;

use routeros_protocol::{Response, ResponseType};

/// The responses returned by a completion or extraction, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCollection {
    responses: Vec<Response>,
}

impl ResponseCollection {
    /// Creates a collection from responses in arrival order.
    pub const fn new(responses: Vec<Response>) -> Self {
        Self { responses }
    }

    /// Returns the responses of the given type.
    pub fn of_type(&self, response_type: ResponseType) -> impl Iterator<Item = &Response> {
        self.responses
            .iter()
            .filter(move |r| r.response_type() == response_type)
    }

    /// Returns the responses carrying the given tag.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Response> {
        self.responses.iter().filter(move |r| r.tag() == tag)
    }

    /// Returns the text values of an attribute across all responses that have it.
    pub fn argument_values(&self, name: &str) -> Vec<String> {
        self.responses
            .iter()
            .filter_map(|r| r.argument(name))
            .map(ToString::to_string)
            .collect()
    }

    /// Returns `true` if any response is an error.
    pub fn has_errors(&self) -> bool {
        self.of_type(ResponseType::Error).next().is_some()
    }

    /// Consumes the collection and returns its responses.
    pub fn into_vec(self) -> Vec<Response> {
        self.responses
    }
}

impl Deref for ResponseCollection {
    type Target = [Response];

    fn deref(&self) -> &Self::Target {
        &self.responses
    }
}

impl From<Vec<Response>> for ResponseCollection {
    fn from(responses: Vec<Response>) -> Self {
        Self::new(responses)
    }
}

impl FromIterator<Response> for ResponseCollection {
    fn from_iter<I: IntoIterator<Item = Response>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<Response> for ResponseCollection {
    fn extend<I: IntoIterator<Item = Response>>(&mut self, iter: I) {
        self.responses.extend(iter);
    }
}

impl IntoIterator for ResponseCollection {
    type Item = Response;
    type IntoIter = std::vec::IntoIter<Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseCollection {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}
