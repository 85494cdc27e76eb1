//! Error types for CLI operations

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// The client failed
    #[error(transparent)]
    Client(#[from] routeros_client::Error),

    /// Invalid command line words
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The router answered with an error
    #[error("Router error: {0}")]
    Trap(String),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// The log subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Client(err) if err.code() == 10000 => vec![
                "Check the username and password",
                "Set ROUTEROS_PASSWORD instead of passing --password",
            ],
            Self::Client(err) if err.code() == 10200 => vec![
                "Check that the port belongs to the API service (8728 by default)",
                "Check that the API service is enabled under /ip service",
            ],
            Self::Client(routeros_client::Error::Transport(_)) => vec![
                "Check that the router is reachable",
                "Increase the timeout with --timeout",
            ],
            Self::InvalidArguments(_) => vec![
                "Arguments are written as =name=value and queries as ?name=value",
                "Use --help to see the expected format",
            ],
            _ => vec![],
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) | Self::Config(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
