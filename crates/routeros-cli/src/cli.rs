//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "rosctl",
    version,
    about = "Send commands to a RouterOS router over the API",
    long_about = "rosctl connects to a RouterOS API service, logs in and sends one command.\n\
                  Words after the command starting with '=' are arguments, words starting\n\
                  with '?' are queries.\n\n\
                  Settings are read from the config file, then ROUTEROS_* environment\n\
                  variables (ROUTEROS_HOST, ROUTEROS_PASSWORD, ...), then flags.\n\n\
                  Example:\n  rosctl -H 192.168.88.1 -u admin /ip/address/print ?interface=ether1"
)]
pub struct Cli {
    /// Connection settings
    #[command(flatten)]
    pub connection: Connection,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Keep a listening command running for this many seconds, printing
    /// responses as they arrive, then cancel it
    #[arg(long, value_name = "SECONDS")]
    pub watch: Option<u64>,

    /// Command to send, such as /ip/address/print or "/ip address print"
    pub command: String,

    /// Argument (=name=value) and query (?...) words
    #[arg(allow_hyphen_values = true)]
    pub words: Vec<String>,
}

/// Connection flags; anything left unset falls back to the config file and
/// the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct Connection {
    /// Config file (TOML, YAML or JSON)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Router host name or address
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// API port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Login name
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Login password
    #[arg(long, short = 'P')]
    pub password: Option<String>,

    /// Share the connection with other sessions of the same user
    #[arg(long)]
    pub persistent: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Charset the router uses, such as windows-1251
    #[arg(long)]
    pub remote_charset: Option<String>,
}

/// Output format for responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per response
    Text,
    /// One JSON document with every response
    Json,
}
