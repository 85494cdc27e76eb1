//! RouterOS client implementation
//!
//! - `core`: the `Client<C>` multiplexing engine
//! - `login`: the challenge-response handshake
//! - `config`: connection and login configuration
//! - `builder`: `ClientBuilder` and TCP connection setup
//! - `invocation`: the single-entry-point façade

pub mod builder;
pub mod config;
pub mod core;
pub mod invocation;
pub mod login;

pub use builder::{ClientBuilder, builder};
pub use config::ClientConfig;
pub use self::core::{Client, Filter};
pub use invocation::{Invocation, InvocationOutcome};
pub use login::{challenge_response, login};
