//! Request rewriting for the upstream hop.
//!
//! # Responsibilities
//! - Compute the upstream path from the route's source and destination
//! - Carry the inbound query string unchanged
//! - Rewrite headers: hop-by-hop removal, `Host`, `X-Forwarded-Host`, `X-Forwarded-For`
//!
//! # Design Decisions
//! - Paths stay in their raw, escaped form end to end
//! - A path outside the source prefix is not stripped; the destination is
//!   prepended to the whole path
//! - The inbound request is only read here; the body is untouched

use std::net::SocketAddr;

use axum::http::header::{HeaderMap, HeaderValue, HOST};
use axum::http::request::Parts;
use axum::http::Method;

use crate::config::RouteConfig;
use crate::http::headers::{append_forwarded_for, remove_hop_by_hop, X_FORWARDED_HOST};

/// Everything needed to issue the upstream request, except the body.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub method: Method,
    /// Rewritten path, raw.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

/// Remove the route's source prefix, leaving the path alone if it does not start with it.
pub fn strip_source<'a>(inbound: &'a str, source: &str) -> &'a str {
    inbound.strip_prefix(source).unwrap_or(inbound)
}

/// `DestinationPath` followed by the inbound path minus `SourcePath`.
pub fn rewrite_path(route: &RouteConfig, inbound: &str) -> String {
    let rest = strip_source(inbound, &route.source_path);
    let mut path = String::with_capacity(route.destination_path.len() + rest.len());
    path.push_str(&route.destination_path);
    path.push_str(rest);
    path
}

/// Host the client addressed: the `Host` header, or the URI authority (HTTP/2).
pub fn inbound_host(parts: &Parts) -> Option<HeaderValue> {
    parts.headers.get(HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
    })
}

/// Headers for the upstream request.
pub fn forward_headers(route: &RouteConfig, parts: &Parts, peer: Option<SocketAddr>) -> HeaderMap {
    let original_host = inbound_host(parts);

    let mut headers = parts.headers.clone();
    remove_hop_by_hop(&mut headers);
    headers.remove(HOST);

    if !route.host.is_empty() {
        if let Ok(host) = HeaderValue::from_str(&route.host) {
            headers.insert(HOST, host);
        }
    }
    if let Some(host) = original_host {
        headers.append(X_FORWARDED_HOST, host);
    }
    if let Some(peer) = peer {
        append_forwarded_for(&mut headers, &peer.ip().to_string());
    }
    headers
}

/// Rewrite an inbound request head for `route`.
pub fn prepare(route: &RouteConfig, parts: &Parts, peer: Option<SocketAddr>) -> Outbound {
    Outbound {
        method: parts.method.clone(),
        path: rewrite_path(route, parts.uri.path()),
        query: parts.uri.query().map(str::to_owned),
        headers: forward_headers(route, parts, peer),
    }
}
