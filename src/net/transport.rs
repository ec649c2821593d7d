//! Outbound transport to upstream origins.
//!
//! # Responsibilities
//! - Own the single HTTP client shared by every route and request
//! - Bound connection establishment by the configured connect timeout
//! - Build the absolute upstream URL for a rewritten request
//! - Stream request bodies to the upstream
//!
//! # Design Decisions
//! - No end-to-end request timeout, only the connect timeout
//! - Redirects are relayed to the client, never followed
//! - Environment proxy settings are ignored
//! - TLS validation uses the platform trust store

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Method};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::config::Scheme;

/// Number of body chunks buffered between the client and upstream sides.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Error type for upstream calls.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("route has no upstream host")]
    MissingHost,

    #[error("invalid upstream url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl TransportError {
    /// True when the upstream could not be reached in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request(e) if e.is_timeout())
    }
}

/// Shared outbound HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
}

impl Upstream {
    /// Create a client whose connection attempts give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client })
    }

    /// Build `scheme://host/path?query`.
    ///
    /// Backslashes in `path` are escaped so the URL parser keeps them as data
    /// instead of reading them as segment separators.
    pub fn target_url(
        scheme: Scheme,
        host: &str,
        path: &str,
        query: Option<&str>,
    ) -> Result<Url, TransportError> {
        if host.is_empty() {
            return Err(TransportError::MissingHost);
        }
        let base = format!("{scheme}://{host}");
        let mut url = Url::parse(&base).map_err(|source| TransportError::InvalidUrl {
            url: base.clone(),
            source,
        })?;
        if path.contains('\\') {
            url.set_path(&path.replace('\\', "%5C"));
        } else {
            url.set_path(path);
        }
        url.set_query(query);
        Ok(url)
    }

    /// Send a request to the upstream and return its response head.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Body,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.request(method, url).headers(headers);
        if !body.is_end_stream() {
            request = request.body(stream_body(body));
        }
        request.send().await.map_err(TransportError::Request)
    }
}

/// Bridge an inbound body into a streaming upstream body.
///
/// Chunks are pumped through a bounded channel by a separate task; the pump
/// stops as soon as the upstream side is dropped.
pub fn stream_body(body: Body) -> reqwest::Body {
    let (tx, mut rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut chunks = body.into_data_stream();
        while let Some(chunk) = chunks.next().await {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });
    reqwest::Body::wrap_stream(futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx)))
}
