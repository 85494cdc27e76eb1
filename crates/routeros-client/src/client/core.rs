//! The request/response multiplexing engine.
//!
//! A [`Client`] owns one communicator and keeps three pieces of state: the
//! number of requests still waiting for their final response, a buffer of
//! responses per tag, and a handler per tag. A tag is active while it has
//! either a buffer or a handler, never both.
//!
//! Every blocking operation funnels into [`Client::dispatch_next_response`],
//! which reads one response and routes it to its handler or buffer.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use routeros_protocol::{Registry, Request, Response, ResponseType, SharedRegistry};
use routeros_transport_traits::{Charset, CharsetKind, Communicator, Direction};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::login::login;
use crate::collection::ResponseCollection;
use crate::error::{Error, Result};
use crate::handlers::ResponseHandler;

/// Which registrations [`Client::is_request_active`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    /// Requests whose responses go to a handler.
    Callback,
    /// Requests whose responses are buffered.
    Buffer,
    /// Either kind.
    #[default]
    All,
}

impl Filter {
    const fn includes_callbacks(self) -> bool {
        matches!(self, Self::Callback | Self::All)
    }

    const fn includes_buffers(self) -> bool {
        matches!(self, Self::Buffer | Self::All)
    }
}

#[derive(Debug, Default)]
struct BufferSlot {
    /// Registration order, used when extracting every buffer at once.
    seq: u64,
    responses: Vec<Response>,
}

/// A RouterOS API session.
///
/// Requests can be sent synchronously ([`send_sync`](Self::send_sync)) or
/// asynchronously with a tag ([`send_async`](Self::send_async),
/// [`send_async_with`](Self::send_async_with)); any number of tagged
/// requests may be outstanding at once. Responses are read only while the
/// caller awaits one of the completing operations.
///
/// Finish a session with [`release`](Self::release) or
/// [`close`](Self::close).
pub struct Client<C: Communicator> {
    com: C,
    pending: usize,
    buffers: HashMap<String, BufferSlot>,
    next_seq: u64,
    callbacks: HashMap<String, Box<dyn ResponseHandler>>,
    streaming: bool,
    registry: Option<Box<dyn Registry>>,
    released: bool,
}

impl<C: Communicator> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("com", &self.com)
            .field("pending", &self.pending)
            .field("buffered_tags", &self.buffers.len())
            .field("callback_tags", &self.callbacks.len())
            .field("streaming", &self.streaming)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<C: Communicator> Client<C> {
    /// Wraps an already authenticated communicator.
    ///
    /// Persistent communicators get a [`SharedRegistry`] so responses of
    /// sessions sharing the socket are kept apart.
    pub fn new(com: C) -> Self {
        let registry: Option<Box<dyn Registry>> = if com.is_persistent() {
            let key = com
                .connection_key()
                .or_else(|| com.endpoint())
                .unwrap_or_default();
            Some(Box::new(SharedRegistry::attach(key)))
        } else {
            None
        };
        Self {
            com,
            pending: 0,
            buffers: HashMap::new(),
            next_seq: 0,
            callbacks: HashMap::new(),
            streaming: false,
            registry,
            released: false,
        }
    }

    /// Logs in over `com` if its socket is fresh and wraps it.
    ///
    /// A rejected login closes the communicator and fails with
    /// [`Error::InvalidCredentials`].
    pub async fn with_login(com: C, username: &str, password: &str) -> Result<Self> {
        let held = if com.is_persistent() {
            Some(com.lock(Direction::All).await?)
        } else {
            None
        };
        let outcome = if com.is_fresh() {
            login(&com, username, password).await
        } else {
            debug!(username, "Reusing an authenticated connection");
            Ok(true)
        };
        if let Some(previous) = held {
            com.unlock(previous).await?;
        }

        if !outcome? {
            if let Err(e) = com.close().await {
                debug!(error = %e, "Closing after a rejected login failed");
            }
            return Err(Error::InvalidCredentials);
        }
        info!(username, endpoint = ?com.endpoint(), "Logged in");
        Ok(Self::new(com))
    }

    /// Returns the communicator.
    pub const fn communicator(&self) -> &C {
        &self.com
    }

    /// Returns the ownership registry of a persistent connection.
    pub fn registry(&self) -> Option<&dyn Registry> {
        self.registry.as_deref()
    }

    /// Returns the charset of the given kind.
    pub fn charset(&self, kind: CharsetKind) -> Option<Charset> {
        self.com.charset(kind)
    }

    /// Replaces the charset of the given kind and returns the previous one.
    pub fn set_charset(&self, kind: CharsetKind, charset: Option<Charset>) -> Option<Charset> {
        self.com.set_charset(kind, charset)
    }

    /// Switches streaming responses and returns the previous setting.
    ///
    /// Streaming responses keep attribute values as the raw bytes the
    /// router sent.
    pub fn set_streaming_responses(&mut self, streaming: bool) -> bool {
        std::mem::replace(&mut self.streaming, streaming)
    }

    /// Returns `true` if responses are streamed.
    pub const fn is_streaming_responses(&self) -> bool {
        self.streaming
    }

    /// Returns the number of requests that have not received their final
    /// response.
    pub const fn pending_requests_count(&self) -> usize {
        self.pending
    }

    /// Returns `true` if `tag` has a registration of the given kind.
    pub fn is_request_active(&self, tag: &str, filter: Filter) -> bool {
        (filter.includes_callbacks() && self.callbacks.contains_key(tag))
            || (filter.includes_buffers() && self.buffers.contains_key(tag))
    }

    /// Sends a tagged request whose responses are buffered.
    pub async fn send_async(&mut self, request: &Request) -> Result<()> {
        self.submit(request, None).await
    }

    /// Sends a tagged request whose responses go to `handler`.
    pub async fn send_async_with<H>(&mut self, request: &Request, handler: H) -> Result<()>
    where
        H: ResponseHandler + 'static,
    {
        self.submit(request, Some(Box::new(handler))).await
    }

    async fn submit(
        &mut self,
        request: &Request,
        handler: Option<Box<dyn ResponseHandler>>,
    ) -> Result<()> {
        let tag = request.tag();
        if tag.is_empty() {
            return Err(Error::MissingTag);
        }
        if self.is_request_active(tag, Filter::All) {
            return Err(Error::DuplicateTag(tag.to_string()));
        }
        self.send(request).await?;

        match handler {
            Some(handler) => {
                debug!(tag, command = request.command(), "Registered handler");
                self.callbacks.insert(tag.to_string(), handler);
            }
            None => {
                debug!(tag, command = request.command(), "Registered buffer");
                self.register_buffer(tag.to_string());
            }
        }
        Ok(())
    }

    async fn send(&mut self, request: &Request) -> Result<()> {
        request.send(&self.com, self.registry.as_deref()).await?;
        self.pending += 1;
        Ok(())
    }

    /// Sends a request and waits for all of its responses.
    ///
    /// Untagged requests are written directly; tagged ones are registered
    /// like [`send_async`](Self::send_async) first.
    pub async fn send_sync(&mut self, request: &Request) -> Result<ResponseCollection> {
        if request.tag().is_empty() {
            self.send(request).await?;
            self.complete_request(None).await
        } else {
            self.send_async(request).await?;
            self.complete_request(Some(request.tag())).await
        }
    }

    /// Waits for a request to finish and returns its responses.
    ///
    /// With a tag, returns everything buffered for it plus what arrives
    /// until its final response; responses of other requests are routed as
    /// usual meanwhile. Without a tag, returns every response dispatched
    /// until nothing is pending or an untagged final response arrives.
    /// In the latter case tagged requests may still be pending when this
    /// returns; their responses seen so far are in the result and also
    /// stay buffered or went to their handlers.
    pub async fn complete_request(&mut self, tag: Option<&str>) -> Result<ResponseCollection> {
        let Some(tag) = tag.filter(|t| !t.is_empty()) else {
            let mut result = Vec::new();
            while self.pending > 0 {
                let response = self.dispatch_next_response(None).await?;
                let untagged_final =
                    response.tag().is_empty() && response.response_type() == ResponseType::Final;
                result.push(response);
                if untagged_final {
                    break;
                }
            }
            return Ok(result.into());
        };

        let mut result = self.extract_new_responses(Some(tag))?.into_vec();
        while self.is_request_active(tag, Filter::All) {
            let response = self.dispatch_next_response(None).await?;
            if response.response_type() == ResponseType::Fatal {
                result.push(response);
                break;
            }
            if response.tag() == tag && response.response_type() == ResponseType::Final {
                if self.is_request_active(tag, Filter::All) {
                    result.extend(self.extract_new_responses(Some(tag))?);
                }
                break;
            }
        }
        Ok(result.into())
    }

    /// Takes the responses buffered so far, without reading anything.
    ///
    /// With a tag, the tag must be active; handler-bound tags yield nothing.
    /// A buffer whose last response is final is removed, ending the tag.
    /// Without a tag, every buffer is drained in registration order.
    pub fn extract_new_responses(&mut self, tag: Option<&str>) -> Result<ResponseCollection> {
        let Some(tag) = tag else {
            let mut tags: Vec<(u64, String)> = self
                .buffers
                .iter()
                .map(|(tag, slot)| (slot.seq, tag.clone()))
                .collect();
            tags.sort_unstable();
            let mut result = ResponseCollection::default();
            for (_, tag) in tags {
                result.extend(self.drain_buffer(&tag));
            }
            return Ok(result);
        };

        if self.callbacks.contains_key(tag) {
            return Ok(ResponseCollection::default());
        }
        if !self.buffers.contains_key(tag) {
            return Err(Error::NoSuchRequest(tag.to_string()));
        }
        Ok(self.drain_buffer(tag).into())
    }

    fn drain_buffer(&mut self, tag: &str) -> Vec<Response> {
        let Some(slot) = self.buffers.get_mut(tag) else {
            return Vec::new();
        };
        let responses = std::mem::take(&mut slot.responses);
        if responses
            .last()
            .is_some_and(|r| r.response_type() == ResponseType::Final)
        {
            self.buffers.remove(tag);
        }
        responses
    }

    fn register_buffer(&mut self, tag: String) -> &mut BufferSlot {
        let seq = &mut self.next_seq;
        self.buffers.entry(tag).or_insert_with(|| {
            *seq += 1;
            BufferSlot {
                seq: *seq,
                responses: Vec::new(),
            }
        })
    }

    /// Dispatches responses while requests are pending.
    ///
    /// Without a timeout this runs until nothing is pending. With one, it
    /// stops once the time is used up, but always dispatches at least once
    /// when something is pending. Returns `true` if requests are still
    /// pending afterwards.
    pub async fn run_loop(&mut self, timeout: Option<Duration>) -> Result<bool> {
        match self.drain(timeout).await {
            Err(err) if err.is_timeout() => {}
            other => other?,
        }
        Ok(self.pending > 0)
    }

    async fn drain(&mut self, timeout: Option<Duration>) -> Result<()> {
        let Some(limit) = timeout else {
            while self.pending > 0 {
                self.dispatch_next_response(None).await?;
            }
            return Ok(());
        };
        let deadline = Instant::now() + limit;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.dispatch_next_response(Some(remaining)).await?;
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok(())
    }

    /// Reads one response and routes it.
    ///
    /// Waits up to `timeout` for data (`None` waits indefinitely) and fails
    /// with [`Error::NoResponseWithinTimeLimit`] if none arrives. On a shared
    /// connection, responses of other sessions read meanwhile count against
    /// the same timeout. A fatal response closes the connection and drops
    /// every unfinished request.
    pub async fn dispatch_next_response(&mut self, timeout: Option<Duration>) -> Result<Response> {
        let response = self.receive_own(timeout).await?;
        trace!(
            response_type = %response.response_type(),
            tag = response.tag(),
            "Dispatching response"
        );

        if response.response_type() == ResponseType::Fatal {
            self.abandon_requests();
            if let Err(e) = self.com.close().await {
                debug!(error = %e, "Closing after a fatal response failed");
            }
            return Ok(response);
        }

        let is_final = response.response_type() == ResponseType::Final;
        if is_final {
            self.pending = self.pending.saturating_sub(1);
        }

        let tag = response.tag().to_string();
        if tag.is_empty() {
            return Ok(response);
        }
        let handled = self
            .callbacks
            .get_mut(&tag)
            .map(|handler| handler.on_response(&response));
        match handled {
            Some(cancel) if is_final => {
                if cancel {
                    debug!(tag, "Handler asked to cancel a finished request");
                }
                self.callbacks.remove(&tag);
            }
            Some(true) => self.cancel_request(Some(&tag)).await?,
            Some(false) => {}
            None => self.register_buffer(tag).responses.push(response.clone()),
        }
        Ok(response)
    }

    /// Waits for the next response of this session.
    async fn receive_own(&mut self, timeout: Option<Duration>) -> Result<Response> {
        let Some(registry) = self.registry.as_deref() else {
            if !self.com.is_data_awaiting(timeout).await? {
                return Err(Error::NoResponseWithinTimeLimit);
            }
            return Ok(Response::receive(&self.com, self.streaming).await?);
        };
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            if !registry.has_parked() {
                let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
                if !self.com.is_data_awaiting(remaining).await? {
                    return Err(Error::NoResponseWithinTimeLimit);
                }
            }
            if let Some(own) = Response::receive_routed(&self.com, self.streaming, registry).await? {
                return Ok(own);
            }
        }
    }

    /// Forgets every request that can no longer finish.
    fn abandon_requests(&mut self) {
        self.pending = 0;
        let handlers = self.callbacks.len();
        self.callbacks.clear();
        let before = self.buffers.len();
        self.buffers.retain(|_, slot| {
            slot.responses
                .last()
                .is_some_and(|r| r.response_type() == ResponseType::Final)
        });
        let dropped = before - self.buffers.len() + handlers;
        if dropped > 0 {
            warn!(dropped, "Connection closed by the router; unfinished requests dropped");
        } else {
            info!("Connection closed by the router");
        }
    }

    /// Cancels a request, or every request when `tag` is `None`.
    ///
    /// Any responses of a canceled tag that were not extracted yet are
    /// discarded, and the tag is no longer active afterwards. On a
    /// persistent connection the cancel commands are written under an
    /// exclusive lock.
    pub fn cancel_request<'a>(&'a mut self, tag: Option<&'a str>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let tag = tag.filter(|t| !t.is_empty());
            if let Some(tag) = tag
                && !self.is_request_active(tag, Filter::All)
            {
                return Err(Error::CancelUnknown(tag.to_string()));
            }

            let held = if self.registry.is_some() {
                Some(self.com.lock(Direction::All).await?)
            } else {
                None
            };
            let sent = self.send_cancels(tag).await;
            if let Some(previous) = held {
                self.com.unlock(previous).await?;
            }
            sent?;

            match tag {
                Some(tag) => {
                    if self.is_request_active(tag, Filter::All) {
                        let discarded = self.complete_request(Some(tag)).await?;
                        debug!(tag, discarded = discarded.len(), "Request canceled");
                    } else {
                        debug!(tag, "Request canceled");
                    }
                }
                None => {
                    self.run_loop(None).await?;
                    let discarded: usize =
                        self.buffers.drain().map(|(_, s)| s.responses.len()).sum();
                    self.callbacks.clear();
                    debug!(discarded, "All requests canceled");
                }
            }
            Ok(())
        })
    }

    async fn send_cancels(&mut self, tag: Option<&str>) -> Result<()> {
        let mut cancel = Request::new("/cancel")?;
        let Some(ownership) = self.registry.as_ref().map(|r| r.ownership_tag().to_string())
        else {
            if let Some(tag) = tag {
                cancel.set_argument("tag", tag)?;
            }
            self.send_sync(&cancel).await?;
            return Ok(());
        };

        let targets = match tag {
            Some(tag) => vec![tag.to_string()],
            None => self.active_tags(),
        };
        let previous = self.set_tagless(true);
        let mut outcome = Ok(());
        for target in targets {
            let sent = match cancel.set_argument("tag", format!("{ownership}{target}")) {
                Ok(_) => self.send_sync(&cancel).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = sent {
                outcome = Err(e);
                break;
            }
        }
        self.set_tagless(previous);
        outcome
    }

    fn set_tagless(&self, tagless: bool) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|r| r.set_tagless_mode(tagless))
    }

    fn active_tags(&self) -> Vec<String> {
        let mut tags: Vec<(u64, String)> = self
            .buffers
            .iter()
            .map(|(tag, slot)| (slot.seq, tag.clone()))
            .collect();
        tags.sort_unstable();
        let mut tags: Vec<String> = tags.into_iter().map(|(_, tag)| tag).collect();
        let mut callbacks: Vec<String> = self.callbacks.keys().cloned().collect();
        callbacks.sort_unstable();
        tags.extend(callbacks);
        tags
    }

    /// Ends the session with `/quit`.
    ///
    /// Returns `true` if the router acknowledged with a fatal response and
    /// the connection was closed, or if it was already closed. Handlers
    /// are dropped and nothing is pending afterwards; buffers of finished
    /// requests can still be extracted.
    pub async fn close(&mut self) -> Result<bool> {
        let previous = self.set_tagless(true);
        let outcome = match Request::new("/quit") {
            Ok(quit) => self.send_sync(&quit).await,
            Err(e) => Err(e.into()),
        };
        self.set_tagless(previous);
        self.callbacks.clear();
        self.pending = 0;
        self.released = true;

        let closed = match outcome {
            Ok(responses) => {
                let fatal = responses
                    .last()
                    .is_some_and(|r| r.response_type() == ResponseType::Fatal);
                fatal && self.com.close().await?
            }
            Err(err) if err.is_connection_closed() => true,
            Err(err) => return Err(err),
        };
        info!(closed, "Session closed");
        Ok(closed)
    }

    /// Ends the session.
    ///
    /// Persistent sessions cancel whatever is still pending and leave the
    /// shared connection open; other sessions close their connection.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        if self.com.is_persistent() {
            if self.pending > 0 {
                self.cancel_request(None).await?;
            }
        } else {
            self.close().await?;
        }
        Ok(())
    }
}

impl<C: Communicator> Drop for Client<C> {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                pending = self.pending,
                persistent = self.com.is_persistent(),
                "Client dropped without release() or close()"
            );
        }
    }
}
