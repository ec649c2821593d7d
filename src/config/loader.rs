//! Configuration loading from the command line.

use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::parser::{parse_route, ParseError};
use crate::config::schema::{ListenerConfig, ProxyConfig, TimeoutConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Route(#[from] ParseError),

    #[error("{}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build and validate a configuration from parsed command-line arguments.
///
/// Fails on the first malformed route argument, naming it.
pub fn load_config(cli: Cli) -> Result<ProxyConfig, ConfigError> {
    let routes = cli
        .routes
        .iter()
        .map(|arg| parse_route(arg, cli.verbose, cli.insecure))
        .collect::<Result<Vec<_>, _>>()?;

    let config = ProxyConfig {
        listener: ListenerConfig {
            bind_address: cli.addr,
        },
        routes,
        command: cli.command,
        timeouts: TimeoutConfig::default(),
        verbose: cli.verbose,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
