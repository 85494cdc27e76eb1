//! # RouterOS TCP Transport
//!
//! TCP implementation of the [`Communicator`] trait for the RouterOS API.
//!
//! ## Features
//!
//! - **Word Framing**: [`SentenceCodec`] implements the length-prefixed word
//!   encoding on top of `tokio_util::codec`
//! - **Persistent Connections**: sessions for the same `host:port/identity`
//!   can share one socket
//! - **Direction Locks**: a session can lock the sending and/or receiving
//!   half of a shared socket; other sessions wait inside their I/O calls
//! - **Timeouts**: bounded connection establishment and writes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routeros_tcp::TcpCommunicator;
//! use routeros_transport_traits::{Communicator, Sentence};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let com = TcpCommunicator::builder()
//!         .host("192.168.88.1")
//!         .identity("admin")
//!         .connect()
//!         .await?;
//!
//!     com.send_sentence(&Sentence::from_words(["/system/identity/print"])).await?;
//!     let reply = com.receive_sentence().await?;
//!     println!("{reply:?}");
//!     Ok(())
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

mod codec;
mod config;
mod transport;

pub use codec::{SentenceCodec, encoded_len};
pub use config::{DEFAULT_PORT, TcpConfig};
pub use transport::{TcpCommunicator, TcpCommunicatorBuilder};

// Re-export transport traits for convenience
pub use routeros_transport_traits::{
    Communicator, Direction, Sentence, TransportError, TransportResult,
};
