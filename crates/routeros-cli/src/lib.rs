//! # rosctl
//!
//! Command-line front end for the RouterOS API client.
//!
//! ## Usage
//!
//! ```bash
//! # Print addresses on one interface
//! rosctl -H 192.168.88.1 -u admin /ip/address/print ?interface=ether1
//!
//! # Add an address, reading the password from the environment
//! ROUTEROS_PASSWORD=secret rosctl -H 192.168.88.1 /ip/address/add \
//!   =address=10.0.0.1/24 =interface=ether2
//!
//! # Follow interface changes for 30 seconds as JSON
//! rosctl -c router.toml --format json --watch 30 /interface/listen
//! ```

pub mod cli;
pub mod error;
pub mod output;
pub mod settings;

use std::time::Duration;

use clap::Parser;
use routeros_client::{Client, Filter, Request, Response, ResponseType, TcpCommunicator};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Connection, OutputFormat};
pub use error::{CliError, CliResult};

const WATCH_TAG: &str = "rosctl";

/// Run the CLI application
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = settings::load(&cli.connection)?;
    let request = build_request(&cli.command, &cli.words)?;
    debug!(?config, command = request.command(), "Starting");

    let mut client = Client::connect(&config).await?;
    info!(host = %config.host, "Connected");

    let outcome = match cli.watch {
        Some(secs) => watch(&mut client, request, Duration::from_secs(secs), cli.format).await,
        None => execute(&mut client, &request, cli.format).await,
    };
    let released = client.release().await;
    outcome?;
    released?;
    Ok(())
}

/// Installs the log subscriber; `RUST_LOG` overrides the `-v` level.
pub fn init_logging(verbose: u8) -> CliResult<()> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Builds a request from the command and its `=argument` and `?query` words.
pub fn build_request(command: &str, words: &[String]) -> CliResult<Request> {
    let mut request = Request::new(command).map_err(routeros_client::Error::from)?;
    for word in words {
        if let Some(argument) = word.strip_prefix('=') {
            let (name, value) = argument.split_once('=').unwrap_or((argument, ""));
            request
                .set_argument(name, value)
                .map_err(|e| CliError::InvalidArguments(e.to_string()))?;
        } else if word.starts_with('?') {
            request = request.with_query(word.as_str());
        } else {
            return Err(CliError::InvalidArguments(format!(
                "'{word}' is neither an argument (=name=value) nor a query (?...)"
            )));
        }
    }
    Ok(request)
}

async fn execute(
    client: &mut Client<TcpCommunicator>,
    request: &Request,
    format: OutputFormat,
) -> CliResult<()> {
    let responses = client.send_sync(request).await?;
    let rendered = output::render(&responses, format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    first_trap(&responses).map_or(Ok(()), Err)
}

async fn watch(
    client: &mut Client<TcpCommunicator>,
    request: Request,
    duration: Duration,
    format: OutputFormat,
) -> CliResult<()> {
    let request = request.with_tag(WATCH_TAG);
    client
        .send_async_with(&request, move |response: &Response| {
            match format {
                OutputFormat::Text => println!("{}", output::text_line(response)),
                OutputFormat::Json => println!("{}", output::to_json(response)),
            }
            false
        })
        .await?;

    let pending = client.run_loop(Some(duration)).await?;
    if pending && client.is_request_active(WATCH_TAG, Filter::Callback) {
        debug!(seconds = duration.as_secs(), "Watch time is up, canceling");
        client.cancel_request(Some(WATCH_TAG)).await?;
    }
    Ok(())
}

fn first_trap(responses: &[Response]) -> Option<CliError> {
    responses
        .iter()
        .find(|r| r.response_type() == ResponseType::Error)
        .map(|r| {
            CliError::Trap(
                r.argument("message")
                    .map_or_else(|| "unknown error".to_string(), |m| m.to_string()),
            )
        })
}
