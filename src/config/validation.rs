//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation after every route argument has parsed
//! - Reject configurations the proxy cannot serve (no routes, bad listen address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Pattern shape and duplicates are checked by the route table, which owns matching

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no configuration specified")]
    NoRoutes,

    #[error("invalid listen address {0:?}")]
    ListenAddress(String),

    #[error("supervised command has an empty program name")]
    EmptyCommand,
}

/// Validate a fully parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let addr = &config.listener.bind_address;
    if addr.is_empty() || !addr.contains(':') || addr.chars().any(char::is_whitespace) {
        errors.push(ValidationError::ListenAddress(addr.clone()));
    }

    if config.command.first().is_some_and(|program| program.is_empty()) {
        errors.push(ValidationError::EmptyCommand);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
