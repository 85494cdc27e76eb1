//! # RouterOS Protocol
//!
//! Request and response model of the RouterOS API.
//!
//! ## What's Inside
//!
//! - **Requests**: [`Request`], a command word with arguments, queries and a tag
//! - **Responses**: [`Response`], [`ResponseType`] and [`ArgumentValue`]
//! - **Ownership**: the [`Registry`] trait and [`SharedRegistry`], which let
//!   several client sessions share one persistent connection without mixing
//!   up each other's replies
//! - **Errors**: [`ProtocolError`], [`ProtocolResult`]
//!
//! ## Wire Shape
//!
//! A request is written as one sentence:
//!
//! ```text
//! /ip/address/print
//! =detail=
//! ?interface=ether1
//! .tag=3_addresses
//! ```
//!
//! and answered by any number of `!re` sentences followed by `!done`
//! (or `!trap` for errors, `!fatal` when the router drops the connection).
//!
//! ```rust,ignore
//! use routeros_protocol::{Request, Response};
//!
//! let request = Request::new("/ip/address/print")?.with_tag("addresses");
//! request.send(&communicator, None).await?;
//! let response = Response::receive(&communicator, false).await?;
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod error;
mod registry;
mod request;
mod response;

pub use error::{ProtocolError, ProtocolResult};
pub use registry::{Registry, SharedRegistry};
pub use request::Request;
pub use response::{ArgumentValue, Response, ResponseType};

/// Word prefix carrying the tag of a request or response.
pub const TAG_PREFIX: &str = ".tag=";

/// Re-export of the transport layer this crate is built on.
pub use routeros_transport_traits as transport;
