//! Layered configuration: config file, then `ROUTEROS_*` environment
//! variables, then command line flags.

use config::{Config, Environment, File};
use routeros_client::ClientConfig;

use crate::cli::Connection;
use crate::error::CliResult;

/// Environment variable prefix, as in `ROUTEROS_HOST`.
pub const ENV_PREFIX: &str = "ROUTEROS";

/// Builds the client configuration for a run.
pub fn load(connection: &Connection) -> CliResult<ClientConfig> {
    load_from(connection, Environment::with_prefix(ENV_PREFIX))
}

fn load_from(connection: &Connection, env: Environment) -> CliResult<ClientConfig> {
    let mut builder = Config::builder();
    if let Some(path) = &connection.config {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }
    let layered: ClientConfig = builder
        .add_source(env.try_parsing(true))
        .build()?
        .try_deserialize()?;
    Ok(apply_flags(layered, connection))
}

fn apply_flags(mut config: ClientConfig, flags: &Connection) -> ClientConfig {
    if let Some(host) = &flags.host {
        config.host.clone_from(host);
    }
    if let Some(port) = flags.port {
        config.port = port;
    }
    if let Some(user) = &flags.user {
        config.username.clone_from(user);
    }
    if let Some(password) = &flags.password {
        config.password.clone_from(password);
    }
    if flags.persistent {
        config.persistent = true;
    }
    if let Some(secs) = flags.timeout {
        config.connect_timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(charset) = &flags.remote_charset {
        config.remote_charset = Some(charset.clone());
        config.local_charset.get_or_insert_with(|| "utf-8".to_string());
    }
    config
}
