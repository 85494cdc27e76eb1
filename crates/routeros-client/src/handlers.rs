//! Callbacks for responses of asynchronous requests.
//!
//! A request sent with a handler never buffers its responses; each one is
//! handed to the handler as it is dispatched. Returning `true` from the
//! handler cancels the request.
//!
//! ```rust,ignore
//! let mut names = Vec::new();
//! client
//!     .send_async_with(&request, move |response: &Response| {
//!         if let Some(name) = response.argument("name") {
//!             names.push(name.to_string());
//!         }
//!         names.len() >= 10
//!     })
//!     .await?;
//! ```

use routeros_protocol::Response;

/// Receives the responses of one asynchronous request.
pub trait ResponseHandler: Send {
    /// Handles one response. Returning `true` cancels the request.
    ///
    /// The final response of a request is delivered too; the handler is
    /// dropped right after it.
    fn on_response(&mut self, response: &Response) -> bool;
}

impl<F> ResponseHandler for F
where
    F: FnMut(&Response) -> bool + Send,
{
    fn on_response(&mut self, response: &Response) -> bool {
        self(response)
    }
}
