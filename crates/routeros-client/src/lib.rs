//! # RouterOS API Client
//!
//! A client for the RouterOS API that multiplexes any number of tagged
//! requests over one connection.
//!
//! ## Features
//!
//! - **Synchronous and asynchronous requests**: wait for a request's
//!   responses, or tag it and collect them later
//! - **Callbacks**: route the responses of a tagged request to a
//!   [`ResponseHandler`] that can cancel it
//! - **Event loop**: [`Client::run_loop`] dispatches responses with an
//!   optional time limit
//! - **Persistent connections**: several sessions of one user can share a
//!   socket; an ownership registry keeps their tags apart
//! - **Charsets**: transparent conversion between the application's and the
//!   router's charset
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routeros_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = ClientBuilder::new("192.168.88.1")
//!         .credentials("admin", "")
//!         .connect()
//!         .await?;
//!
//!     // Two requests in flight at once
//!     client.send_async(&Request::new("/ip/address/print")?.with_tag("addr")).await?;
//!     client.send_async(&Request::new("/interface/print")?.with_tag("iface")).await?;
//!     client.run_loop(None).await?;
//!
//!     for response in client.extract_new_responses(Some("iface"))? {
//!         if let Some(name) = response.argument("name") {
//!             println!("{name}");
//!         }
//!     }
//!     client.release().await
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every [`Error`] has a stable numeric [`code`](Error::code) and an
//! [`ErrorKind`]. Running out of time while waiting for a response is
//! [`Error::NoResponseWithinTimeLimit`], which [`Client::run_loop`]
//! swallows.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod client;
pub mod collection;
pub mod error;
pub mod handlers;
pub mod prelude;

pub use client::{
    Client, ClientBuilder, ClientConfig, Filter, Invocation, InvocationOutcome, builder,
    challenge_response, login,
};
pub use collection::ResponseCollection;
pub use error::{Error, ErrorKind, Result};
pub use handlers::ResponseHandler;

pub use routeros_protocol::{ArgumentValue, Registry, Request, Response, ResponseType, SharedRegistry};
pub use routeros_tcp::{TcpCommunicator, TcpConfig};
pub use routeros_transport_traits::{Charset, CharsetKind, Communicator, Direction};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
