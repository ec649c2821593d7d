//! Route argument parsing.
//!
//! Turns one `<path>=<target>` argument into a [`RouteConfig`].
//!
//! # Design Decisions
//! - Exactly one `=` is required; anything else is rejected with the argument
//! - A target without `://` gets the default scheme prepended
//! - Paths are kept in their escaped form; only the escapes are validated
//! - The target's query and fragment are ignored

use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{RouteConfig, Scheme};

/// Error produced while parsing a route argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed target in {arg:?}: {reason}")]
    MalformedTarget { arg: String, reason: String },

    #[error("unsupported scheme {scheme:?} in {arg:?} (expected http or https)")]
    UnsupportedScheme { arg: String, scheme: String },
}

impl ParseError {
    /// The original argument that failed to parse.
    pub fn argument(&self) -> &str {
        match self {
            ParseError::InvalidArgument(arg)
            | ParseError::MalformedTarget { arg, .. }
            | ParseError::UnsupportedScheme { arg, .. } => arg,
        }
    }
}

/// Target URL split into the parts a route needs.
#[derive(Debug, PartialEq, Eq)]
struct Target<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: &'a str,
}

/// Parse a route argument of the form `<path>=<target>`.
///
/// `insecure` selects `http` instead of `https` for targets without a scheme.
pub fn parse_route(arg: &str, verbose: bool, insecure: bool) -> Result<RouteConfig, ParseError> {
    let mut parts = arg.split('=');
    let (source, target) = match (parts.next(), parts.next(), parts.next()) {
        (Some(source), Some(target), None) => (source, target),
        _ => return Err(ParseError::InvalidArgument(arg.to_string())),
    };

    let target = if target.contains("://") {
        target.to_string()
    } else {
        format!("{}://{}", Scheme::default_for(insecure), target)
    };

    let malformed = |reason: &str| ParseError::MalformedTarget {
        arg: arg.to_string(),
        reason: reason.to_string(),
    };

    let parsed = split_target(&target).map_err(malformed)?;
    let scheme = Scheme::from_name(parsed.scheme).ok_or_else(|| ParseError::UnsupportedScheme {
        arg: arg.to_string(),
        scheme: parsed.scheme.to_string(),
    })?;

    let destination_path = if parsed.path.is_empty() {
        source.to_string()
    } else {
        parsed.path.to_string()
    };

    Ok(RouteConfig {
        source_path: source.to_string(),
        destination_path,
        host: parsed.authority.to_string(),
        scheme,
        verbose,
    })
}

fn split_target(target: &str) -> Result<Target<'_>, &'static str> {
    let (scheme, rest) = split_scheme(target)?;
    let rest = rest
        .strip_prefix("//")
        .ok_or("expected \"//\" after the scheme")?;

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    validate_authority(authority)?;
    validate_escapes(path)?;

    Ok(Target {
        scheme,
        authority,
        path,
    })
}

// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
fn split_scheme(target: &str) -> Result<(&str, &str), &'static str> {
    for (idx, c) in target.char_indices() {
        match c {
            'a'..='z' | 'A'..='Z' => {}
            '0'..='9' | '+' | '-' | '.' if idx > 0 => {}
            ':' if idx > 0 => return Ok((&target[..idx], &target[idx + 1..])),
            ':' => return Err("missing scheme"),
            _ => return Err("invalid scheme"),
        }
    }
    Err("missing scheme")
}

fn validate_authority(authority: &str) -> Result<(), &'static str> {
    if authority.is_empty() {
        return Ok(());
    }
    Authority::from_str(authority).map_err(|_| "invalid host")?;

    // Everything after the last ':' outside an IPv6 literal is the port.
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let after_literal = match host_port.rfind(']') {
        Some(idx) => &host_port[idx + 1..],
        None => host_port,
    };
    if let Some((_, port)) = after_literal.rsplit_once(':') {
        if !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err("invalid port");
        }
    }
    Ok(())
}

fn validate_escapes(path: &str) -> Result<(), &'static str> {
    let bytes = path.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let valid = bytes
                .get(idx + 1..idx + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err("invalid escape in path");
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }
    Ok(())
}
