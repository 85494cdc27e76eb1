//! Prelude module for convenient imports
//!
//! ```rust,no_run
//! use routeros_client::prelude::*;
//! ```

pub use crate::{CRATE_NAME, VERSION};

pub use crate::{
    // Core client types
    Client,
    ClientBuilder,
    ClientConfig,
    Filter,
    Invocation,
    InvocationOutcome,
    // Handlers
    ResponseHandler,
    // Results and errors
    Error,
    ErrorKind,
    Result,
    ResponseCollection,
};

pub use crate::{ArgumentValue, Request, Response, ResponseType};
pub use crate::{Charset, CharsetKind, Communicator};
