//! Responses sent back to the client.
//!
//! # Responsibilities
//! - Relay an upstream response: status, end-to-end headers, streamed body
//! - Produce the proxy's own responses (502, 404, 301)
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped before relaying
//! - Every transport failure is a 502; the proxy never answers 504

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::headers::remove_hop_by_hop;

/// Body of the not-found response.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Turn an upstream response into the client response.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    remove_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The upstream could not be reached.
pub fn bad_gateway() -> Response {
    StatusCode::BAD_GATEWAY.into_response()
}

/// No route selects the path.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}

/// Permanent redirect to `location`.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => not_found(),
    }
}
