//! Single entry point over the client operations.

use std::time::Duration;

use routeros_protocol::Request;
use routeros_transport_traits::Communicator;

use super::core::Client;
use crate::collection::ResponseCollection;
use crate::error::Result;

/// An operation for [`Client::invoke`].
#[derive(Debug, Clone)]
pub enum Invocation {
    /// Run the event loop, optionally bounded by a timeout.
    Loop(Option<Duration>),
    /// Send a request: asynchronously when tagged, synchronously otherwise.
    Send(Request),
    /// Complete every pending request.
    CompleteAll,
    /// Complete the request with this tag.
    Complete(String),
}

/// What [`Client::invoke`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The loop ran; `true` if requests are still pending.
    Pending(bool),
    /// A tagged request was sent.
    Sent,
    /// Responses of a completed request.
    Responses(ResponseCollection),
}

impl InvocationOutcome {
    /// Returns the responses, if any were produced.
    pub fn into_responses(self) -> Option<ResponseCollection> {
        match self {
            Self::Responses(responses) => Some(responses),
            _ => None,
        }
    }
}

impl From<Duration> for Invocation {
    fn from(timeout: Duration) -> Self {
        Self::Loop(Some(timeout))
    }
}

impl From<Request> for Invocation {
    fn from(request: Request) -> Self {
        Self::Send(request)
    }
}

impl From<&str> for Invocation {
    fn from(tag: &str) -> Self {
        Self::Complete(tag.to_string())
    }
}

impl From<String> for Invocation {
    fn from(tag: String) -> Self {
        Self::Complete(tag)
    }
}

impl From<Option<String>> for Invocation {
    fn from(tag: Option<String>) -> Self {
        tag.map_or(Self::CompleteAll, Self::Complete)
    }
}

impl<C: Communicator> Client<C> {
    /// Runs the operation an [`Invocation`] describes.
    ///
    /// ```rust,ignore
    /// client.invoke(Request::new("/ip/address/print")?.with_tag("a")).await?;
    /// client.invoke(Duration::from_secs(2)).await?;
    /// let responses = client.invoke("a").await?.into_responses();
    /// ```
    pub async fn invoke(&mut self, invocation: impl Into<Invocation>) -> Result<InvocationOutcome> {
        Ok(match invocation.into() {
            Invocation::Loop(timeout) => InvocationOutcome::Pending(self.run_loop(timeout).await?),
            Invocation::Send(request) if request.tag().is_empty() => {
                InvocationOutcome::Responses(self.send_sync(&request).await?)
            }
            Invocation::Send(request) => {
                self.send_async(&request).await?;
                InvocationOutcome::Sent
            }
            Invocation::CompleteAll => {
                InvocationOutcome::Responses(self.complete_request(None).await?)
            }
            Invocation::Complete(tag) => {
                InvocationOutcome::Responses(self.complete_request(Some(&tag)).await?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!(matches!(
            Invocation::from(Duration::from_secs(1)),
            Invocation::Loop(Some(_))
        ));
        assert!(matches!(Invocation::from("a"), Invocation::Complete(t) if t == "a"));
        assert!(matches!(Invocation::from(None::<String>), Invocation::CompleteAll));
        let request = Request::new("/system/identity/print").unwrap();
        assert!(matches!(Invocation::from(request), Invocation::Send(_)));
    }

    #[test]
    fn test_into_responses() {
        assert_eq!(InvocationOutcome::Sent.into_responses(), None);
        assert_eq!(
            InvocationOutcome::Responses(ResponseCollection::default()).into_responses(),
            Some(ResponseCollection::default())
        );
    }
}
