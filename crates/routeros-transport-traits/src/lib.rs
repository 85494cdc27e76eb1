//! # RouterOS Transport Traits
//!
//! Core transport abstractions for the RouterOS API client.
//! This crate provides the foundation the protocol and client layers depend on.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Traits**: [`Communicator`], the byte-level connection a client session talks through
//! - **Types**: [`Sentence`], [`Direction`], [`CharsetKind`]
//! - **Charsets**: [`Charset`], [`Charsets`], [`transcode`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Config**: [`LimitsConfig`], [`TimeoutConfig`]
//!
//! ## Usage
//!
//! Transport implementations depend on this crate and implement [`Communicator`]:
//!
//! ```rust,ignore
//! use routeros_transport_traits::{Communicator, Sentence, TransportResult};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct MyCommunicator { /* ... */ }
//!
//! #[async_trait]
//! impl Communicator for MyCommunicator {
//!     async fn send_sentence(&self, sentence: &Sentence) -> TransportResult<usize> { /* ... */ }
//!     // ... other trait methods
//! }
//! ```

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

mod charset;
mod config;
mod error;
mod sentence;
mod traits;
mod types;

// Re-export all public items
pub use charset::{Charset, Charsets, transcode};
pub use config::{LimitsConfig, TimeoutConfig};
pub use error::{TransportError, TransportResult};
pub use sentence::Sentence;
pub use traits::Communicator;
pub use types::{CharsetKind, Direction};

// Re-export validation functions
pub use error::validate_sentence_size;
